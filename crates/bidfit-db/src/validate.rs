//! Structural and plausibility checks on analysis payloads before they are
//! persisted.
//!
//! Validation works on the JSON form so it also covers payloads that did not
//! come from this crate's own types.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

const ERROR_PENALTY: f64 = 0.2;
const WARNING_PENALTY: f64 = 0.05;
/// Tolerated clock skew before an analysis date counts as "in the future".
const FUTURE_SKEW_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// `1 - 0.2 * errors - 0.05 * warnings`, clamped to `[0, 1]`.
    pub quality_score: f64,
}

impl ValidationReport {
    #[allow(clippy::cast_precision_loss)]
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        let penalty =
            ERROR_PENALTY * errors.len() as f64 + WARNING_PENALTY * warnings.len() as f64;
        Self {
            is_valid: errors.is_empty(),
            quality_score: (1.0 - penalty).clamp(0.0, 1.0),
            errors,
            warnings,
        }
    }
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |node, key| node.get(key))
}

/// Validate an analysis payload as of `now`. Never fails; every problem is
/// reported in the returned lists.
#[must_use]
pub fn validate_analysis(payload: &Value, now: DateTime<Utc>) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !payload.is_object() {
        errors.push("payload must be a JSON object".to_string());
        return ValidationReport::from_findings(errors, warnings);
    }

    match lookup(payload, "supplier_id").and_then(Value::as_str) {
        Some(raw) if Uuid::parse_str(raw).is_ok() => {}
        Some(raw) => errors.push(format!("supplier_id is not a valid UUID: {raw}")),
        None => errors.push("supplier_id is required".to_string()),
    }

    let score = lookup(payload, "credibility.score").and_then(Value::as_f64);
    match score {
        Some(s) if (0.0..=10.0).contains(&s) => {}
        Some(s) => errors.push(format!("credibility.score {s} is outside [0, 10]")),
        None => errors.push("credibility.score is required and must be a number".to_string()),
    }

    let factor_count = match lookup(payload, "credibility.factors") {
        Some(Value::Array(factors)) => factors.len(),
        Some(_) => {
            errors.push("credibility.factors must be an array".to_string());
            0
        }
        None => {
            warnings.push("credibility.factors is missing".to_string());
            0
        }
    };

    if let Some(s) = score {
        if factor_count == 0 && s > 8.0 {
            errors.push(format!(
                "credibility.score {s} exceeds 8 without any supporting factors"
            ));
        } else if factor_count == 0 && s > 6.5 {
            warnings.push(format!(
                "credibility.score {s} exceeds 6.5 without any supporting factors"
            ));
        }
    }

    match lookup(payload, "confidence").and_then(Value::as_f64) {
        Some(c) if (0.0..=1.0).contains(&c) => {}
        Some(c) => errors.push(format!("confidence {c} is outside [0, 1]")),
        None => errors.push("confidence is required and must be a number".to_string()),
    }

    let rank = lookup(payload, "market_position.rank");
    let share = lookup(payload, "market_position.market_share").and_then(Value::as_str);
    match rank {
        Some(r) if r.as_u64().is_some_and(|r| r >= 1) => {}
        Some(r) => errors.push(format!("market_position.rank must be a positive integer, got {r}")),
        None => warnings.push("market_position.rank is missing".to_string()),
    }
    if rank.and_then(Value::as_u64) == Some(1) && share == Some("minimal") {
        errors.push("market_position rank 1 contradicts a minimal market share".to_string());
    }

    match lookup(payload, "analyzed_at").and_then(Value::as_str) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(at) if at.with_timezone(&Utc) > now + Duration::minutes(FUTURE_SKEW_MINUTES) => {
                warnings.push(format!("analyzed_at {raw} is in the future"));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("analyzed_at is not an RFC 3339 timestamp: {e}")),
        },
        None => errors.push("analyzed_at is required".to_string()),
    }

    ValidationReport::from_findings(errors, warnings)
}
