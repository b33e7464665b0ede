//! Capability extraction, credibility scoring and analysis assembly.
//!
//! Everything in this crate is pure and synchronous: no I/O, no shared state.

pub mod compare;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod insights;
pub mod keywords;
pub mod orchestrator;
pub mod scorer;

pub use compare::{compare_snapshots, AnalysisDelta};
pub use domain::infer_domain;
pub use error::ScoringError;
pub use extractor::extract;
pub use orchestrator::{analyze, Analyzer, MISSING_NAME_ERROR};
pub use scorer::{score, CredibilityOutcome};
