use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by supplier stores and the resilient repository.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("supplier not found: {0}")]
    NotFound(Uuid),

    #[error("circuit breaker is open; retry in {retry_after_secs}s")]
    CircuitOpen { retry_after_secs: u64 },

    #[error("database operation timed out")]
    Timeout,

    #[error("deadlock or serialization failure: {0}")]
    Deadlock(String),

    #[error("database connection lost: {0}")]
    ConnectionLost(String),

    #[error("schema object missing: {0}")]
    MissingStructure(String),

    #[error("analysis payload rejected: {}", .0.join("; "))]
    InvalidPayload(Vec<String>),

    #[error("failed to decode {context}: {source}")]
    Serialization {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl StoreError {
    /// Errors worth retrying after a back-off delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout | StoreError::Deadlock(_) | StoreError::ConnectionLost(_)
        )
    }

    #[must_use]
    pub fn is_missing_structure(&self) -> bool {
        matches!(self, StoreError::MissingStructure(_))
    }

    /// Whether this error indicates an unhealthy store and should count toward
    /// opening the circuit breaker. Caller mistakes and data errors do not.
    #[must_use]
    pub fn counts_against_breaker(&self) -> bool {
        match self {
            StoreError::Timeout
            | StoreError::Deadlock(_)
            | StoreError::ConnectionLost(_)
            | StoreError::MissingStructure(_)
            | StoreError::Migration(_)
            | StoreError::Sqlx(_) => true,
            StoreError::NotFound(_)
            | StoreError::CircuitOpen { .. }
            | StoreError::InvalidPayload(_)
            | StoreError::Serialization { .. } => false,
        }
    }
}

/// Classifies driver errors by SQLSTATE into the store taxonomy.
///
/// | SQLSTATE         | Meaning                          | Maps to            |
/// |------------------|----------------------------------|--------------------|
/// | `40P01`, `40001` | deadlock, serialization failure  | `Deadlock`         |
/// | `57P01`, `08xxx` | admin shutdown, connection error | `ConnectionLost`   |
/// | `57014`          | statement timeout / cancel       | `Timeout`          |
/// | `42P01`, `3F000` | undefined table / schema         | `MissingStructure` |
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::PoolClosed => StoreError::ConnectionLost("pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::ConnectionLost(e.to_string()),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                let message = db.message().to_string();
                match code.as_str() {
                    "40P01" | "40001" => StoreError::Deadlock(message),
                    "57P01" => StoreError::ConnectionLost(message),
                    c if c.starts_with("08") => StoreError::ConnectionLost(message),
                    "57014" => StoreError::Timeout,
                    "42P01" | "3F000" => StoreError::MissingStructure(message),
                    _ => StoreError::Sqlx(sqlx::Error::Database(db)),
                }
            }
            other => StoreError::Sqlx(other),
        }
    }
}
