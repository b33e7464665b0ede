//! Capability extraction: turns declared capabilities plus raw enrichment
//! text into a normalized, bounded capability set.

use std::collections::HashSet;

use bidfit_core::{CapabilityAnalysis, EnrichmentPayload, ScoringThresholds, SupplierRecord};

use crate::domain::infer_domain;
use crate::keywords::{KeywordRule, CERTIFICATION_RULES, DESCRIPTION_RULES, SERVICE_RULES};

/// Entries shorter than this are dropped.
pub const MIN_CAPABILITY_LEN: usize = 3;

/// Ordered, case-insensitively deduplicated set of capability strings.
#[derive(Debug, Default)]
struct CapabilitySet {
    entries: Vec<String>,
    seen: HashSet<String>,
    limit: usize,
}

impl CapabilitySet {
    fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Insert `entry` if it is new and the set has room. Returns `true` on insert.
    fn insert(&mut self, entry: &str) -> bool {
        if self.entries.len() >= self.limit {
            return false;
        }
        let Some(clean) = sanitize(entry) else {
            return false;
        };
        if !self.seen.insert(clean.to_lowercase()) {
            return false;
        }
        self.entries.push(clean);
        true
    }

    fn apply_rules(&mut self, rules: &[KeywordRule], text: &str) {
        if text.is_empty() {
            return;
        }
        for rule in rules {
            if rule.is_match(text) {
                self.insert(rule.capability);
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

/// Normalize one raw entry, or `None` when it is garbage.
///
/// Control characters are stripped and internal whitespace collapsed. Entries
/// with fewer than [`MIN_CAPABILITY_LEN`] characters or without a single
/// alphanumeric character are rejected.
fn sanitize(raw: &str) -> Option<String> {
    let collapsed = raw
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() < MIN_CAPABILITY_LEN {
        return None;
    }
    if !collapsed.chars().any(char::is_alphanumeric) {
        return None;
    }
    Some(collapsed)
}

/// Declared capabilities after sanitizing, deduplicating and truncating.
fn declared_capabilities(supplier: &SupplierRecord, limit: usize) -> Vec<String> {
    let mut set = CapabilitySet::with_limit(limit);
    for capability in &supplier.capabilities {
        set.insert(capability);
    }
    set.into_vec()
}

/// Derive the full capability analysis for a supplier.
///
/// Deterministic and infallible. Without enrichment the declared capabilities
/// are returned unchanged (after sanitizing) and the enhancement ratio is 1.
#[must_use]
pub fn extract(
    supplier: &SupplierRecord,
    enrichment: Option<&EnrichmentPayload>,
    thresholds: &ScoringThresholds,
) -> CapabilityAnalysis {
    let limit = thresholds.max_capabilities.max(1);
    let original = declared_capabilities(supplier, limit);

    let mut working = CapabilitySet::with_limit(limit);
    for capability in &original {
        working.insert(capability);
    }

    if let Some(e) = enrichment {
        working.apply_rules(&DESCRIPTION_RULES, e.description_text());
        for service in e.non_blank_services() {
            working.apply_rules(&SERVICE_RULES, service);
        }
        for certification in e.non_blank_certifications() {
            working.apply_rules(&CERTIFICATION_RULES, certification);
        }
    }

    let enhanced = working.into_vec();
    let domain = infer_domain(supplier, enrichment);
    let specializations = specializations(&original, enrichment, domain, thresholds);
    let enhancement_ratio = enhancement_ratio(original.len(), enhanced.len());

    CapabilityAnalysis {
        original,
        enhanced,
        domain,
        specializations,
        enhancement_ratio,
    }
}

/// `enhanced / original`, or the raw enhanced count when nothing was declared.
#[allow(clippy::cast_precision_loss)]
fn enhancement_ratio(original: usize, enhanced: usize) -> f64 {
    if original == 0 {
        enhanced as f64
    } else {
        enhanced as f64 / original as f64
    }
}

fn specializations(
    original: &[String],
    enrichment: Option<&EnrichmentPayload>,
    domain: bidfit_core::Domain,
    thresholds: &ScoringThresholds,
) -> Vec<String> {
    let mut set = CapabilitySet::with_limit(thresholds.max_specializations.max(1));
    for capability in original {
        set.insert(capability);
    }
    if let Some(e) = enrichment {
        for service in e.non_blank_services().take(2) {
            set.insert(service);
        }
    }
    if domain.is_specialized() {
        set.insert(&format!("{domain} domain expertise"));
    }
    set.into_vec()
}
