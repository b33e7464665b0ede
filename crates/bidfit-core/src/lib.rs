//! Shared domain types and configuration for the supplier analysis pipeline.

pub mod analysis;
pub mod app_config;
pub mod config;
pub mod supplier;
pub mod thresholds;

pub use analysis::{
    AnalysisResult, AnalysisStatus, CapabilityAnalysis, CredibilityBreakdown, CredibilityReport,
    DataQuality, Domain, MarketCategory, MarketPosition, QualityCap, QualityLevel,
    ANALYSIS_SCHEMA_VERSION,
};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use supplier::{CaseStudy, EnrichmentPayload, SupplierRecord};
pub use thresholds::{load_scoring_thresholds, ScoringThresholds};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read scoring thresholds file {path}: {source}")]
    ThresholdsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scoring thresholds file: {0}")]
    ThresholdsFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
