//! Supplier persistence: the storage trait, its Postgres and in-memory
//! backends, and the resilient repository that wraps them.

pub mod audit;
pub mod breaker;
pub mod cache;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod retry;
pub mod store;
pub mod validate;

pub use audit::{AuditEntry, AuditLog};
pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use cache::{CacheStats, QueryCache};
pub use error::StoreError;
pub use memory::{Fault, MemoryStore};
pub use postgres::{AnalysisRow, PgSupplierStore, SupplierRow};
pub use repository::{ResilienceConfig, ResilientRepository};
pub use retry::RetryPolicy;
pub use store::{
    ArchiveReport, HistoryEntry, SupplierStatistics, SupplierStore, UpsertOperation,
    UpsertOutcome,
};
pub use validate::{validate_analysis, ValidationReport};

use std::time::Duration;

use bidfit_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/bidfit-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; treat
    // absence as zero applied.
    let applied_before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let applied_after = applied_migrations(pool).await;

    let delta = usize::try_from((applied_after - applied_before).max(0)).unwrap_or(0);
    tracing::info!(applied = delta, "migrations up to date");
    Ok(delta)
}

async fn applied_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Recreate schema objects that went missing after migrations were recorded
/// as applied.
///
/// Runs the migrator, then replays every migration script. The scripts only
/// use `IF NOT EXISTS` DDL, so replaying them is a no-op on a healthy schema.
///
/// # Errors
///
/// Returns [`StoreError`] if the migrator or any replayed script fails.
pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    for migration in MIGRATOR.iter() {
        sqlx::raw_sql(&migration.sql).execute(pool).await?;
    }
    tracing::info!(
        migrations = MIGRATOR.iter().count(),
        "schema bootstrap complete"
    );
    Ok(())
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
