//! Change detection between two analysis snapshots of the same supplier.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bidfit_core::{AnalysisResult, Domain, MarketCategory};

/// What moved between an earlier and a later snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDelta {
    pub previous_id: Uuid,
    pub current_id: Uuid,
    pub score_delta: f64,
    pub confidence_delta: f64,
    pub capabilities_added: Vec<String>,
    pub capabilities_removed: Vec<String>,
    /// `(previous, current)` when the inferred domain changed.
    pub domain_change: Option<(Domain, Domain)>,
    /// `(previous, current)` when the market category changed.
    pub category_change: Option<(MarketCategory, MarketCategory)>,
}

impl AnalysisDelta {
    /// `true` when nothing material changed.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.score_delta.abs() < f64::EPSILON
            && self.confidence_delta.abs() < f64::EPSILON
            && self.capabilities_added.is_empty()
            && self.capabilities_removed.is_empty()
            && self.domain_change.is_none()
            && self.category_change.is_none()
    }
}

/// Capabilities present in `from` but not in `against`, compared
/// case-insensitively and kept in `from` order.
fn difference(from: &[String], against: &[String]) -> Vec<String> {
    let against: HashSet<String> = against.iter().map(|c| c.to_lowercase()).collect();
    from.iter()
        .filter(|c| !against.contains(&c.to_lowercase()))
        .cloned()
        .collect()
}

/// Compare `previous` with `current`. Deltas are `current - previous`.
#[must_use]
pub fn compare_snapshots(previous: &AnalysisResult, current: &AnalysisResult) -> AnalysisDelta {
    let before = &previous.capabilities;
    let after = &current.capabilities;

    AnalysisDelta {
        previous_id: previous.id,
        current_id: current.id,
        score_delta: current.credibility.score - previous.credibility.score,
        confidence_delta: current.confidence - previous.confidence,
        capabilities_added: difference(&after.enhanced, &before.enhanced),
        capabilities_removed: difference(&before.enhanced, &after.enhanced),
        domain_change: (before.domain != after.domain).then_some((before.domain, after.domain)),
        category_change: (previous.market_position.category != current.market_position.category)
            .then_some((
                previous.market_position.category,
                current.market_position.category,
            )),
    }
}
