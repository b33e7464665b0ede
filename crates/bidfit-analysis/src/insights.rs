//! Secondary fields derived from the capability and credibility results:
//! confidence, data quality, market position, advantages, insights, and
//! recommendations.

use bidfit_core::{
    CapabilityAnalysis, DataQuality, Domain, EnrichmentPayload, MarketCategory, MarketPosition,
    QualityLevel, SupplierRecord,
};

const CONFIDENCE_BASE: f64 = 0.7;
const DATA_QUALITY_BASE: f64 = 0.5;

/// Recommendation added whenever an analysis completes only partially.
pub const DATA_VALIDATION_RECOMMENDATION: &str =
    "Data validation needed: review the supplier profile inputs before relying on this analysis";

/// Confidence in the analysis, in `[0, 1]`.
///
/// Starts at 0.7, earns small boosts for rich enrichment, then is scaled by
/// `0.7 + 0.3 * credibility / 10`.
#[must_use]
pub fn confidence(enrichment: Option<&EnrichmentPayload>, credibility: f64) -> f64 {
    let mut confidence = CONFIDENCE_BASE;
    if let Some(e) = enrichment {
        if e.description_len() > 100 {
            confidence += 0.1;
        }
        if e.non_blank_services().count() > 3 {
            confidence += 0.1;
        }
        if e.non_blank_certifications().next().is_some() {
            confidence += 0.05;
        }
        if e.testimonials() >= 5 {
            confidence += 0.05;
        }
    }

    let credibility = credibility.clamp(0.0, 10.0);
    confidence *= 0.7 + 0.3 * (credibility / 10.0);
    confidence.clamp(0.0, 1.0)
}

/// Weighted completeness of the enrichment sources.
///
/// | Source          | Weight | Full credit at         |
/// |-----------------|--------|------------------------|
/// | description     | 0.15   | 200+ characters        |
/// | services        | 0.10   | 3+ entries             |
/// | certifications  | 0.10   | 1+ entry               |
/// | testimonials    | 0.05   | 1+                     |
/// | case studies    | 0.10   | 1+                     |
#[must_use]
pub fn data_quality(enrichment: Option<&EnrichmentPayload>) -> DataQuality {
    let mut score = DATA_QUALITY_BASE;
    let mut missing = Vec::new();

    let description_len = enrichment.map_or(0, EnrichmentPayload::description_len);
    score += match description_len {
        0 => 0.0,
        1..=49 => 0.05,
        50..=199 => 0.1,
        _ => 0.15,
    };
    if description_len == 0 {
        missing.push("description".to_string());
    }

    let services = enrichment.map_or(0, |e| e.non_blank_services().count());
    score += match services {
        0 => 0.0,
        1..=2 => 0.05,
        _ => 0.1,
    };
    if services == 0 {
        missing.push("services".to_string());
    }

    if enrichment.is_some_and(|e| e.non_blank_certifications().next().is_some()) {
        score += 0.1;
    } else {
        missing.push("certifications".to_string());
    }

    if enrichment.is_some_and(|e| e.testimonials() > 0) {
        score += 0.05;
    } else {
        missing.push("testimonials".to_string());
    }

    if enrichment.is_some_and(|e| !e.case_studies.is_empty()) {
        score += 0.1;
    } else {
        missing.push("case_studies".to_string());
    }

    let score = score.clamp(DATA_QUALITY_BASE, 1.0);
    let level = if score >= 0.85 {
        QualityLevel::High
    } else if score >= 0.65 {
        QualityLevel::Medium
    } else {
        QualityLevel::Low
    };

    DataQuality {
        score,
        level,
        missing_sources: missing,
    }
}

/// Provenance of the data that fed an analysis.
#[must_use]
pub fn data_sources(enrichment: Option<&EnrichmentPayload>) -> Vec<String> {
    let mut sources = vec!["supplier_profile".to_string()];
    let Some(e) = enrichment else {
        return sources;
    };
    if e.description_len() > 0 {
        sources.push("description".to_string());
    }
    if e.non_blank_services().next().is_some() {
        sources.push("services".to_string());
    }
    if e.non_blank_certifications().next().is_some() {
        sources.push("certifications".to_string());
    }
    if e.testimonials() > 0 {
        sources.push("testimonials".to_string());
    }
    if !e.case_studies.is_empty() {
        sources.push("case_studies".to_string());
    }
    sources
}

pub(crate) fn effective_team_size(
    supplier: &SupplierRecord,
    enrichment: Option<&EnrichmentPayload>,
) -> u32 {
    enrichment
        .and_then(|e| e.team_size)
        .or(supplier.team_size)
        .unwrap_or(0)
}

pub(crate) fn effective_years(supplier: &SupplierRecord) -> f64 {
    supplier
        .years_experience
        .filter(|y| y.is_finite() && *y > 0.0)
        .unwrap_or(0.0)
}

/// Classify by team size × years of experience.
#[must_use]
pub fn market_position(team_size: u32, years: f64) -> MarketPosition {
    let category = if team_size >= 100 && years >= 10.0 {
        MarketCategory::EstablishedLeader
    } else if team_size >= 50 && years >= 5.0 {
        MarketCategory::GrowingPlayer
    } else if team_size >= 10 && years >= 3.0 {
        MarketCategory::MidMarket
    } else {
        MarketCategory::Emerging
    };

    let (rank, market_share) = match category {
        MarketCategory::EstablishedLeader => (1, "significant"),
        MarketCategory::GrowingPlayer => (2, "moderate"),
        MarketCategory::MidMarket => (3, "moderate"),
        MarketCategory::Emerging => (4, "minimal"),
    };

    MarketPosition {
        category,
        rank,
        market_share: market_share.to_string(),
    }
}

#[must_use]
pub fn competitive_advantages(
    capabilities: &CapabilityAnalysis,
    team_size: u32,
    years: f64,
    certifications: usize,
) -> Vec<String> {
    let mut advantages = Vec::new();
    if capabilities.domain.is_specialized() {
        advantages.push(format!("Deep {} domain expertise", capabilities.domain));
    }
    if team_size >= 50 {
        advantages.push("Scale to staff large, multi-team engagements".to_string());
    }
    if years >= 10.0 {
        advantages.push(format!("Proven longevity with {years} years in business"));
    }
    if certifications >= 3 {
        advantages.push("Strong certification portfolio".to_string());
    }
    if capabilities.enhanced.len() >= 8 {
        advantages.push("Broad capability coverage".to_string());
    }
    advantages
}

#[must_use]
pub fn insights(capabilities: &CapabilityAnalysis, credibility: f64, years: f64) -> Vec<String> {
    let mut insights = Vec::new();

    insights.push(if credibility > 7.0 {
        "High credibility supplier with a strong, verifiable track record".to_string()
    } else if credibility >= 5.0 {
        "Solid mid-market supplier with proven delivery capabilities".to_string()
    } else {
        "Emerging supplier still building its market presence".to_string()
    });

    if capabilities.domain.is_specialized() {
        insights.push(format!(
            "Specialized in {0}: strong fit for {0} opportunities",
            capabilities.domain
        ));
    } else {
        insights.push(
            "Generalist technology provider suited to cross-industry opportunities".to_string(),
        );
    }

    let added = capabilities
        .enhanced
        .len()
        .saturating_sub(capabilities.original.len());
    if added > 0 {
        insights.push(format!(
            "Supplied materials surfaced {added} capabilities beyond the declared profile"
        ));
    }

    if years >= 10.0 {
        insights.push("Over a decade of delivery experience".to_string());
    }

    insights
}

/// The certification a buyer in `domain` most commonly expects.
fn expected_certification(domain: Domain) -> (&'static str, &'static str) {
    match domain {
        Domain::Healthcare => ("hipaa", "HIPAA compliance"),
        Domain::Finance => ("soc 2", "SOC 2"),
        Domain::Education => ("ferpa", "FERPA compliance"),
        Domain::Retail => ("pci", "PCI DSS"),
        Domain::Manufacturing => ("iso 9001", "ISO 9001"),
        Domain::RealEstate => ("iso 14001", "ISO 14001"),
        Domain::Logistics => ("c-tpat", "C-TPAT"),
        Domain::Energy => ("iso 50001", "ISO 50001"),
        Domain::Technology => ("iso 27001", "ISO 27001"),
    }
}

#[must_use]
pub fn recommendations(
    capabilities: &CapabilityAnalysis,
    enrichment: Option<&EnrichmentPayload>,
    partial: bool,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if partial {
        recommendations.push(DATA_VALIDATION_RECOMMENDATION.to_string());
    }

    let certifications: Vec<String> = enrichment
        .map(|e| {
            e.non_blank_certifications()
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    if certifications.is_empty() {
        recommendations.push(
            "Obtain industry certifications (e.g. ISO 9001, SOC 2) to strengthen credibility"
                .to_string(),
        );
    } else {
        let (needle, label) = expected_certification(capabilities.domain);
        if !certifications.iter().any(|c| c.contains(needle)) {
            recommendations.push(format!(
                "Add {label} certification to compete for {} contracts",
                capabilities.domain
            ));
        }
    }

    let description_len = enrichment.map_or(0, EnrichmentPayload::description_len);
    if description_len < 100 {
        recommendations.push(
            "Expand the company description with concrete outcomes and specializations"
                .to_string(),
        );
    }

    if enrichment.map_or(0, |e| e.non_blank_services().count()) < 3 {
        recommendations
            .push("List core service offerings to improve opportunity matching".to_string());
    }

    if enrichment.map_or(0, EnrichmentPayload::testimonials) < 10 {
        recommendations.push("Collect client testimonials to build social proof".to_string());
    }

    if enrichment.is_none_or(|e| e.case_studies.is_empty()) {
        recommendations
            .push("Publish case studies that document completed projects".to_string());
    }

    recommendations
}
