//! Rule-based credibility scoring.
//!
//! Every component follows a piecewise-linear curve against a fixed maximum.
//! The components are summed, a quality cap is applied for thin profiles, and
//! the total is clamped to `[0, 10]`.

use std::collections::HashSet;

use bidfit_core::{
    CredibilityBreakdown, CredibilityReport, Domain, EnrichmentPayload, QualityCap,
    ScoringThresholds, SupplierRecord,
};

use crate::domain::{corroborating_sources, infer_domain};
use crate::error::ScoringError;

pub const MAX_EXPERIENCE: f64 = 4.0;
pub const MAX_PROJECTS: f64 = 2.0;
pub const MAX_CERTIFICATIONS: f64 = 2.0;
pub const MAX_TEAM_SIZE: f64 = 1.5;
pub const MAX_TESTIMONIALS: f64 = 1.0;
pub const FINANCIAL_STABILITY_BONUS: f64 = 0.5;
pub const DOMAIN_BASE_BONUS: f64 = 1.5;
pub const DEEP_SPECIALIZATION_BONUS: f64 = 0.5;

/// Result of scoring one supplier.
#[derive(Debug, Clone, PartialEq)]
pub enum CredibilityOutcome {
    Scored {
        breakdown: CredibilityBreakdown,
        factors: Vec<String>,
    },
    /// Scoring could not run; `score` is the configured safe default.
    SafeDefault { score: f64, reason: String },
}

impl CredibilityOutcome {
    #[must_use]
    pub fn score(&self) -> f64 {
        match self {
            CredibilityOutcome::Scored { breakdown, .. } => breakdown.total,
            CredibilityOutcome::SafeDefault { score, .. } => *score,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, CredibilityOutcome::SafeDefault { .. })
    }

    #[must_use]
    pub fn into_report(self) -> CredibilityReport {
        match self {
            CredibilityOutcome::Scored { breakdown, factors } => CredibilityReport {
                score: breakdown.total,
                breakdown: Some(breakdown),
                factors,
                fallback_reason: None,
            },
            CredibilityOutcome::SafeDefault { score, reason } => CredibilityReport {
                score,
                breakdown: None,
                factors: Vec::new(),
                fallback_reason: Some(reason),
            },
        }
    }
}

/// Normalized inputs for the scoring curves.
#[derive(Debug, Clone, PartialEq)]
struct ScoringInputs {
    years: f64,
    years_recorded: bool,
    projects: u32,
    certifications: usize,
    team_size: u32,
    testimonials: u32,
    financial_strong: bool,
    domain: Domain,
    corroborating_sources: usize,
    has_enrichment_signal: bool,
}

impl ScoringInputs {
    fn gather(
        supplier: &SupplierRecord,
        enrichment: Option<&EnrichmentPayload>,
    ) -> Result<Self, ScoringError> {
        let years = match supplier.years_experience {
            Some(y) if !y.is_finite() => {
                return Err(ScoringError::InvalidInput {
                    field: "years_experience",
                    reason: format!("expected a finite number, got {y}"),
                })
            }
            Some(y) if y < 0.0 => {
                return Err(ScoringError::InvalidInput {
                    field: "years_experience",
                    reason: format!("expected a non-negative number, got {y}"),
                })
            }
            Some(y) => y,
            None => 0.0,
        };
        let years_recorded = years > 0.0;

        let case_studies = enrichment.map_or(0, |e| e.case_studies.len());
        let projects = supplier
            .project_count
            .unwrap_or_else(|| u32::try_from(case_studies).unwrap_or(u32::MAX));

        let certifications = enrichment.map_or(0, |e| {
            e.non_blank_certifications()
                .map(str::to_lowercase)
                .collect::<HashSet<_>>()
                .len()
        });

        let team_size = enrichment
            .and_then(|e| e.team_size)
            .or(supplier.team_size)
            .unwrap_or(0);

        let testimonials = enrichment.map_or(0, EnrichmentPayload::testimonials);

        let financial_strong = enrichment
            .and_then(|e| e.financial_stability.as_deref())
            .is_some_and(|rating| rating.trim().eq_ignore_ascii_case("strong"));

        let domain = infer_domain(supplier, enrichment);
        let corroborating_sources = corroborating_sources(domain, enrichment);

        let has_enrichment_signal = years_recorded
            || enrichment.is_some_and(|e| {
                e.description_len() >= 50
                    || !e.case_studies.is_empty()
                    || e.non_blank_services().count() >= 3
            });

        Ok(Self {
            years,
            years_recorded,
            projects,
            certifications,
            team_size,
            testimonials,
            financial_strong,
            domain,
            corroborating_sources,
            has_enrichment_signal,
        })
    }
}

#[must_use]
pub fn experience_score(years: f64) -> f64 {
    if years >= 15.0 {
        4.0
    } else if years >= 10.0 {
        3.0
    } else if years >= 5.0 {
        2.0
    } else if years >= 2.0 {
        1.0
    } else {
        (years.max(0.0) * 0.2).min(MAX_EXPERIENCE)
    }
}

#[must_use]
pub fn project_score(count: u32) -> f64 {
    match count {
        20.. => 2.0,
        10..=19 => 1.5,
        5..=9 => 1.0,
        2..=4 => 0.5,
        n => f64::from(n) * 0.1,
    }
}

#[must_use]
pub fn certification_score(count: usize) -> f64 {
    match count {
        4.. => 2.0,
        2..=3 => 1.0,
        1 => 0.5,
        _ => 0.0,
    }
}

#[must_use]
pub fn team_size_score(size: u32) -> f64 {
    match size {
        100.. => 1.5,
        50..=99 => 1.0,
        20..=49 => 0.7,
        10..=19 => 0.5,
        n => f64::from(n) * 0.01,
    }
}

#[must_use]
pub fn testimonial_score(count: u32) -> f64 {
    match count {
        50.. => 1.0,
        20..=49 => 0.7,
        10..=19 => 0.5,
        n => f64::from(n) * 0.02,
    }
}

fn domain_expertise_score(inputs: &ScoringInputs, thresholds: &ScoringThresholds) -> f64 {
    if !inputs.domain.is_specialized() {
        return 0.0;
    }
    if inputs.corroborating_sources >= thresholds.deep_specialization_min_sources {
        DOMAIN_BASE_BONUS + DEEP_SPECIALIZATION_BONUS
    } else {
        DOMAIN_BASE_BONUS
    }
}

/// The lowest applicable ceiling for thin or weak profiles.
fn quality_cap(inputs: &ScoringInputs, thresholds: &ScoringThresholds) -> Option<QualityCap> {
    let mut caps = Vec::new();
    if !inputs.has_enrichment_signal {
        caps.push(QualityCap {
            ceiling: thresholds.minimal_data_ceiling,
            reason: "no enrichment signal: description, case studies, services and \
                     experience are all missing"
                .to_string(),
        });
    }
    if inputs.years <= 1.0 && inputs.projects <= 2 && inputs.team_size <= 5 {
        caps.push(QualityCap {
            ceiling: thresholds.weak_profile_ceiling,
            reason: "weak profile: at most 1 year of experience, 2 projects and 5 staff"
                .to_string(),
        });
    }
    caps.into_iter().min_by(|a, b| a.ceiling.total_cmp(&b.ceiling))
}

fn supporting_factors(inputs: &ScoringInputs, breakdown: &CredibilityBreakdown) -> Vec<String> {
    let mut factors = Vec::new();
    if breakdown.experience > 0.0 {
        factors.push(format!("{} years of experience", inputs.years));
    }
    if breakdown.project_portfolio > 0.0 {
        factors.push(format!("{} completed projects", inputs.projects));
    }
    if breakdown.certifications > 0.0 {
        factors.push(format!("{} certifications", inputs.certifications));
    }
    if breakdown.team_size > 0.0 {
        factors.push(format!("team of {}", inputs.team_size));
    }
    if breakdown.testimonials > 0.0 {
        factors.push(format!("{} client testimonials", inputs.testimonials));
    }
    if breakdown.financial_stability > 0.0 {
        factors.push("strong financial stability rating".to_string());
    }
    if breakdown.domain_expertise > 0.0 {
        factors.push(format!("{} domain specialization", inputs.domain));
    }
    factors
}

fn try_score(
    supplier: &SupplierRecord,
    enrichment: Option<&EnrichmentPayload>,
    thresholds: &ScoringThresholds,
) -> Result<(CredibilityBreakdown, Vec<String>), ScoringError> {
    let inputs = ScoringInputs::gather(supplier, enrichment)?;

    let mut breakdown = CredibilityBreakdown {
        experience: experience_score(inputs.years),
        project_portfolio: project_score(inputs.projects),
        certifications: certification_score(inputs.certifications),
        team_size: team_size_score(inputs.team_size),
        testimonials: testimonial_score(inputs.testimonials),
        financial_stability: if inputs.financial_strong {
            FINANCIAL_STABILITY_BONUS
        } else {
            0.0
        },
        domain_expertise: domain_expertise_score(&inputs, thresholds),
        quality_cap: quality_cap(&inputs, thresholds),
        total: 0.0,
    };
    breakdown.total = breakdown.recompute_total();

    let factors = supporting_factors(&inputs, &breakdown);
    Ok((breakdown, factors))
}

/// Score a supplier's credibility.
///
/// Never fails: when the inputs cannot be scored the outcome is
/// [`CredibilityOutcome::SafeDefault`] carrying
/// [`ScoringThresholds::safe_default_score`] and the reason.
#[must_use]
pub fn score(
    supplier: &SupplierRecord,
    enrichment: Option<&EnrichmentPayload>,
    thresholds: &ScoringThresholds,
) -> CredibilityOutcome {
    match try_score(supplier, enrichment, thresholds) {
        Ok((breakdown, factors)) => CredibilityOutcome::Scored { breakdown, factors },
        Err(e) => {
            tracing::warn!(
                supplier_id = %supplier.id,
                fallback_score = thresholds.safe_default_score,
                error = %e,
                "credibility scoring fell back to safe default"
            );
            CredibilityOutcome::SafeDefault {
                score: thresholds.safe_default_score,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
