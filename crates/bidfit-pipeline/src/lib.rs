//! Supplier analysis service: loads suppliers, runs the analysis, persists
//! results, and serves history and statistics.

pub mod error;
pub mod service;

pub use error::ServiceError;
pub use service::{AnalysisService, BatchEnvelope, BatchStatus, ServiceConfig, SupplierHistory};
