//! Tunable constants for scoring and extraction.
//!
//! Defaults match the production heuristics. A YAML file can override any
//! subset of them:
//!
//! ```yaml
//! minimal_data_ceiling: 3.5
//! deep_specialization_min_sources: 3
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringThresholds {
    /// Score ceiling for suppliers with no enrichment signal at all.
    pub minimal_data_ceiling: f64,
    /// Score ceiling for suppliers with ≤1 year, ≤2 projects and ≤5 staff.
    pub weak_profile_ceiling: f64,
    /// How many of {description, services, certifications} must corroborate
    /// the inferred domain for the deep-specialization bonus.
    pub deep_specialization_min_sources: usize,
    /// Score returned when scoring cannot run on the supplied data.
    pub safe_default_score: f64,
    /// Upper bound on the enhanced capability set.
    pub max_capabilities: usize,
    /// Upper bound on the specialization list.
    pub max_specializations: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            minimal_data_ceiling: 3.5,
            weak_profile_ceiling: 5.0,
            deep_specialization_min_sources: 3,
            safe_default_score: 3.0,
            max_capabilities: 20,
            max_specializations: 5,
        }
    }
}

impl ScoringThresholds {
    /// Check that every threshold is within its meaningful range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ceilings = [
            ("minimal_data_ceiling", self.minimal_data_ceiling),
            ("weak_profile_ceiling", self.weak_profile_ceiling),
            ("safe_default_score", self.safe_default_score),
        ];
        for (name, value) in ceilings {
            if !value.is_finite() || !(0.0..=10.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 10], got {value}"
                )));
            }
        }

        if !(1..=3).contains(&self.deep_specialization_min_sources) {
            return Err(ConfigError::Validation(format!(
                "deep_specialization_min_sources must be 1, 2, or 3, got {}",
                self.deep_specialization_min_sources
            )));
        }

        if self.max_capabilities == 0 || self.max_specializations == 0 {
            return Err(ConfigError::Validation(
                "max_capabilities and max_specializations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load and validate scoring thresholds from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or fails validation.
pub fn load_scoring_thresholds(path: &Path) -> Result<ScoringThresholds, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ThresholdsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let thresholds: ScoringThresholds = serde_yaml::from_str(&content)?;
    thresholds.validate()?;
    Ok(thresholds)
}
