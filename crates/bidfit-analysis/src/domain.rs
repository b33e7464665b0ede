//! Industry domain inference.

use bidfit_core::{Domain, EnrichmentPayload, SupplierRecord};

use crate::keywords::domain_keyword_hits;

/// Text sources considered during inference, each scored independently.
fn text_sources(supplier: &SupplierRecord, enrichment: Option<&EnrichmentPayload>) -> Vec<String> {
    let mut sources = vec![
        supplier.capabilities.join(" | "),
        supplier.industries.join(" | "),
    ];
    if let Some(e) = enrichment {
        sources.push(e.description_text().to_string());
        sources.push(e.non_blank_services().collect::<Vec<_>>().join(" | "));
        sources.push(e.non_blank_certifications().collect::<Vec<_>>().join(" | "));
    }
    sources
}

/// Infer the supplier's primary domain.
///
/// Each scored domain earns one hit per distinct keyword found in each text
/// source. The highest total wins; ties go to the domain declared first in
/// [`Domain::SCORED`]. With no hits at all the result is
/// [`Domain::Technology`].
#[must_use]
pub fn infer_domain(supplier: &SupplierRecord, enrichment: Option<&EnrichmentPayload>) -> Domain {
    let sources = text_sources(supplier, enrichment);

    let mut best = Domain::Technology;
    let mut best_hits = 0usize;
    for domain in Domain::SCORED {
        let hits: usize = sources
            .iter()
            .map(|text| domain_keyword_hits(domain, text))
            .sum();
        if hits > best_hits {
            best = domain;
            best_hits = hits;
        }
    }
    best
}

/// How many of {description, services, certifications} mention `domain`.
#[must_use]
pub fn corroborating_sources(domain: Domain, enrichment: Option<&EnrichmentPayload>) -> usize {
    let Some(e) = enrichment else {
        return 0;
    };
    if !domain.is_specialized() {
        return 0;
    }

    let services = e.non_blank_services().collect::<Vec<_>>().join(" | ");
    let certifications = e.non_blank_certifications().collect::<Vec<_>>().join(" | ");
    [e.description_text(), services.as_str(), certifications.as_str()]
        .iter()
        .filter(|text| domain_keyword_hits(domain, text) > 0)
        .count()
}
