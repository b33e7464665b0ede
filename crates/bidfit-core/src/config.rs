use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BIDFIT_ENV", "development"))?;
    let log_level = or_default("BIDFIT_LOG_LEVEL", "info");
    let scoring_path = lookup("BIDFIT_SCORING_PATH").ok().map(PathBuf::from);

    let db_max_connections = parse_num(
        "BIDFIT_DB_MAX_CONNECTIONS",
        &or_default("BIDFIT_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_num(
        "BIDFIT_DB_MIN_CONNECTIONS",
        &or_default("BIDFIT_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_num(
        "BIDFIT_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("BIDFIT_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let cache_ttl_secs = parse_num(
        "BIDFIT_CACHE_TTL_SECS",
        &or_default("BIDFIT_CACHE_TTL_SECS", "300"),
    )?;
    let breaker_threshold: u32 = parse_num(
        "BIDFIT_BREAKER_THRESHOLD",
        &or_default("BIDFIT_BREAKER_THRESHOLD", "3"),
    )?;
    if breaker_threshold == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BIDFIT_BREAKER_THRESHOLD".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let breaker_cooldown_secs = parse_num(
        "BIDFIT_BREAKER_COOLDOWN_SECS",
        &or_default("BIDFIT_BREAKER_COOLDOWN_SECS", "30"),
    )?;
    let max_retries = parse_num(
        "BIDFIT_MAX_RETRIES",
        &or_default("BIDFIT_MAX_RETRIES", "2"),
    )?;
    let retry_backoff_base_secs = parse_num(
        "BIDFIT_RETRY_BACKOFF_BASE_SECS",
        &or_default("BIDFIT_RETRY_BACKOFF_BASE_SECS", "1"),
    )?;
    let audit_capacity = parse_num(
        "BIDFIT_AUDIT_CAPACITY",
        &or_default("BIDFIT_AUDIT_CAPACITY", "1000"),
    )?;
    let batch_chunk_size: usize = parse_num(
        "BIDFIT_BATCH_CHUNK_SIZE",
        &or_default("BIDFIT_BATCH_CHUNK_SIZE", "5"),
    )?;
    let batch_pause_ms = parse_num(
        "BIDFIT_BATCH_PAUSE_MS",
        &or_default("BIDFIT_BATCH_PAUSE_MS", "500"),
    )?;
    let retention_days = parse_num(
        "BIDFIT_RETENTION_DAYS",
        &or_default("BIDFIT_RETENTION_DAYS", "365"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        scoring_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        cache_ttl_secs,
        breaker_threshold,
        breaker_cooldown_secs,
        max_retries,
        retry_backoff_base_secs,
        audit_capacity,
        batch_chunk_size: batch_chunk_size.max(1),
        batch_pause_ms,
        retention_days,
    })
}

fn parse_num<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BIDFIT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
