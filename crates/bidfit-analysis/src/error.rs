use thiserror::Error;

/// Conditions under which credibility scoring cannot run on the supplied data.
///
/// Never surfaced to callers directly: the scorer converts it into a
/// safe-default outcome that records the message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}
