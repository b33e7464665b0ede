//! Offline tests for the resilient repository, backed by `MemoryStore`.
//! These tests do not require a live database connection.

use std::time::Duration;

use bidfit_core::{AnalysisResult, AppConfig, Environment, SupplierRecord};
use bidfit_db::{
    CircuitState, Fault, HistoryEntry, MemoryStore, PoolConfig, ResilienceConfig,
    ResilientRepository, RetryPolicy, StoreError, SupplierStore, UpsertOperation,
};
use chrono::Utc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn supplier(name: &str) -> SupplierRecord {
    let mut record = SupplierRecord::new(Uuid::new_v4(), name);
    record.capabilities = vec!["Systems integration".to_string()];
    record.years_experience = Some(8.0);
    record.project_count = Some(12);
    record.team_size = Some(30);
    record
}

fn analysis_for(record: &SupplierRecord) -> AnalysisResult {
    bidfit_analysis::analyze(record, None)
}

async fn repository_with(
    suppliers: Vec<SupplierRecord>,
    config: ResilienceConfig,
) -> ResilientRepository<MemoryStore> {
    ResilientRepository::new(MemoryStore::with_suppliers(suppliers).await, config)
}

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        scoring_path: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        cache_ttl_secs: 120,
        breaker_threshold: 4,
        breaker_cooldown_secs: 15,
        max_retries: 1,
        retry_backoff_base_secs: 2,
        audit_capacity: 50,
        batch_chunk_size: 5,
        batch_pause_ms: 500,
        retention_days: 365,
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn resilience_config_from_app_config_uses_core_values() {
    let config = ResilienceConfig::from_app_config(&app_config());
    assert_eq!(config.cache_ttl, Duration::from_secs(120));
    assert_eq!(config.breaker_threshold, 4);
    assert_eq!(config.breaker_cooldown, Duration::from_secs(15));
    assert_eq!(
        config.retry,
        RetryPolicy {
            max_retries: 1,
            backoff_base: Duration::from_secs(2),
        }
    );
    assert_eq!(config.audit_capacity, 50);
}

// ---------------------------------------------------------------------------
// Upserts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upsert_inserts_then_updates_with_increasing_versions() {
    let repo = repository_with(vec![], ResilienceConfig::default()).await;
    let record = supplier("Fresh Supplier");

    let first = repo
        .upsert_analysis(record.id, &analysis_for(&record))
        .await
        .expect("first upsert");
    assert_eq!(first.operation, UpsertOperation::Inserted);
    assert_eq!(first.version, 1);
    assert_eq!(first.handle, record.id);

    let second = repo
        .upsert_analysis(record.id, &analysis_for(&record))
        .await
        .expect("second upsert");
    assert_eq!(second.operation, UpsertOperation::Updated);
    assert_eq!(second.version, 2);

    let stored = repo.get_supplier(record.id).await.expect("supplier exists");
    assert_eq!(stored.name.as_deref(), Some("Fresh Supplier"));
    assert!(stored.credibility_score.is_some());
    assert!(stored.last_analyzed_at.is_some());
}

#[tokio::test]
async fn invalid_payload_never_reaches_store() {
    let record = supplier("Inflated Inc");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    let mut analysis = analysis_for(&record);
    analysis.credibility.score = 9.5;
    analysis.credibility.factors.clear();

    let err = repo
        .upsert_analysis(record.id, &analysis)
        .await
        .expect_err("payload must be refused");
    assert!(matches!(err, StoreError::InvalidPayload(ref errors) if errors.len() == 1));
    assert_eq!(repo.store().call_count(), 0);

    let audit = repo.audit_log().await;
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
    assert!(audit[0].metadata.contains_key("validation_errors"));
}

#[tokio::test]
async fn mismatched_supplier_id_is_refused() {
    let record = supplier("Someone Else");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    let err = repo
        .upsert_analysis(Uuid::new_v4(), &analysis_for(&record))
        .await
        .expect_err("mismatch must be refused");
    assert!(matches!(err, StoreError::InvalidPayload(_)));
}

#[tokio::test]
async fn archived_supplier_is_not_found_and_does_not_trip_breaker() {
    let mut record = supplier("Retired Vendor");
    record.archived_at = Some(Utc::now());
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    for _ in 0..4 {
        let err = repo
            .upsert_analysis(record.id, &analysis_for(&record))
            .await
            .expect_err("archived suppliers reject analyses");
        assert!(matches!(err, StoreError::NotFound(id) if id == record.id));
    }
    assert_eq!(repo.breaker_state().await.state, CircuitState::Closed);
}

#[tokio::test]
async fn batch_upsert_isolates_failures() {
    let a = supplier("Alpha");
    let b = supplier("Bravo");
    let c = supplier("Charlie");
    let repo = repository_with(
        vec![a.clone(), b.clone(), c.clone()],
        ResilienceConfig::default(),
    )
    .await;

    let mut bad = analysis_for(&b);
    bad.confidence = 1.5;

    let results = repo
        .batch_upsert(&[
            (a.id, analysis_for(&a)),
            (b.id, bad),
            (c.id, analysis_for(&c)),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StoreError::InvalidPayload(_))));
    assert!(results[2].is_ok());
}

// ---------------------------------------------------------------------------
// Circuit breaker
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn breaker_opens_fails_fast_and_recovers_after_cooldown() {
    let record = supplier("Flaky Backend Co");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;
    repo.store().inject(Fault::Fatal, 3).await;

    for _ in 0..3 {
        assert!(matches!(
            repo.get_supplier(record.id).await,
            Err(StoreError::Sqlx(_))
        ));
    }
    assert_eq!(repo.breaker_state().await.state, CircuitState::Open);
    assert_eq!(repo.store().call_count(), 3);

    // Open: fails fast with no store I/O.
    assert!(matches!(
        repo.get_supplier(record.id).await,
        Err(StoreError::CircuitOpen { .. })
    ));
    assert_eq!(repo.store().call_count(), 3);

    tokio::time::advance(Duration::from_secs(30)).await;
    let recovered = repo.get_supplier(record.id).await.expect("trial call succeeds");
    assert_eq!(recovered.id, record.id);
    assert_eq!(repo.store().call_count(), 4);

    let breaker = repo.breaker_state().await;
    assert_eq!(breaker.state, CircuitState::Closed);
    assert_eq!(breaker.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_count_as_a_single_failure() {
    let record = supplier("Slow Storage Ltd");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;
    repo.store().inject(Fault::Timeout, 3).await;

    let err = repo.get_supplier(record.id).await.expect_err("timeouts exhaust retries");
    assert!(matches!(err, StoreError::Timeout));
    assert_eq!(repo.store().call_count(), 3);

    let breaker = repo.breaker_state().await;
    assert_eq!(breaker.state, CircuitState::Closed);
    assert_eq!(breaker.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn caller_error_on_trial_call_closes_half_open_breaker() {
    let healthy = supplier("Healthy Vendor");
    let mut retired = supplier("Retired Vendor");
    retired.archived_at = Some(Utc::now());
    let repo = repository_with(
        vec![healthy.clone(), retired.clone()],
        ResilienceConfig::default(),
    )
    .await;
    repo.store().inject(Fault::Fatal, 3).await;
    for _ in 0..3 {
        assert!(repo.get_supplier(healthy.id).await.is_err());
    }
    assert_eq!(repo.breaker_state().await.state, CircuitState::Open);

    tokio::time::advance(Duration::from_secs(30)).await;
    let err = repo
        .upsert_analysis(retired.id, &analysis_for(&retired))
        .await
        .expect_err("archived supplier rejects analyses");
    assert!(matches!(err, StoreError::NotFound(_)));

    let breaker = repo.breaker_state().await;
    assert_eq!(breaker.state, CircuitState::Closed);
    assert_eq!(breaker.consecutive_failures, 0);
}

// ---------------------------------------------------------------------------
// Retry and self-healing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried_and_audited() {
    let record = supplier("Busy Database Corp");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;
    repo.store().inject(Fault::Deadlock, 2).await;

    let found = repo.get_supplier(record.id).await.expect("succeeds on third try");
    assert_eq!(found.id, record.id);

    let audit = repo.audit_log().await;
    let last = audit.last().expect("call was audited");
    assert_eq!(last.operation, "get_supplier");
    assert!(last.success);
    assert_eq!(last.metadata["retries"], 2);
}

#[tokio::test]
async fn missing_schema_is_bootstrapped_once() {
    let record = supplier("Rebuilt Tables Inc");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;
    repo.store().drop_schema().await;

    let found = repo.get_supplier(record.id).await.expect("self-heal succeeds");
    assert_eq!(found.id, record.id);
    assert_eq!(repo.store().bootstrap_count(), 1);

    let audit = repo.audit_log().await;
    assert_eq!(audit[0].metadata["self_healed"], true);
    assert_eq!(audit[0].metadata["retries"], 0);
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reads_are_cached_until_ttl_expires() {
    let record = supplier("Cached Co");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    repo.get_supplier(record.id).await.expect("first read");
    repo.get_supplier(record.id).await.expect("second read");
    assert_eq!(repo.store().call_count(), 1);

    let stats = repo.cache_stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    tokio::time::advance(Duration::from_secs(301)).await;
    repo.get_supplier(record.id).await.expect("read after expiry");
    assert_eq!(repo.store().call_count(), 2);
}

#[tokio::test]
async fn cached_reads_are_audited() {
    let record = supplier("Audited Reads Co");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    for _ in 0..3 {
        repo.get_supplier(record.id).await.expect("read");
    }
    repo.get_history(record.id).await.expect("history");
    repo.get_history(record.id).await.expect("cached history");
    repo.statistics().await.expect("statistics");
    repo.statistics().await.expect("cached statistics");
    assert_eq!(repo.store().call_count(), 3);

    let audit = repo.audit_log().await;
    assert_eq!(audit.len(), 7);
    assert!(audit.iter().all(|e| e.success && e.metadata["retries"] == 0));
    let cached: Vec<&str> = audit
        .iter()
        .filter(|e| e.metadata.get("cached") == Some(&serde_json::Value::Bool(true)))
        .map(|e| e.operation.as_str())
        .collect();
    assert_eq!(
        cached,
        vec!["get_supplier", "get_supplier", "get_history", "statistics"]
    );
    assert_eq!(audit[0].subject, Some(record.id));
}

#[tokio::test]
async fn writes_do_not_invalidate_cached_history() {
    let record = supplier("Stale Reads Ltd");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    assert!(repo.get_history(record.id).await.expect("history").is_empty());
    repo.upsert_analysis(record.id, &analysis_for(&record))
        .await
        .expect("upsert");
    assert!(repo.get_history(record.id).await.expect("cached").is_empty());

    let fresh = repo
        .store()
        .fetch_history(record.id, 10)
        .await
        .expect("direct read");
    assert_eq!(fresh.len(), 1);
}

// ---------------------------------------------------------------------------
// Archival, statistics, audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_moves_only_expired_history() {
    let record = supplier("Long History LLC");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;

    let mut old = analysis_for(&record);
    old.analyzed_at = Utc::now() - chrono::Duration::days(400);
    repo.store()
        .insert_history(HistoryEntry {
            analysis_id: old.id,
            supplier_id: record.id,
            version: 1,
            status: "success".to_string(),
            credibility_score: old.credibility.score,
            confidence: old.confidence,
            analyzed_at: old.analyzed_at,
            snapshot: old,
        })
        .await;
    let current = repo
        .upsert_analysis(record.id, &analysis_for(&record))
        .await
        .expect("upsert");
    assert_eq!(current.version, 2);

    let report = repo.archive_older_than(365).await.expect("archive");
    assert_eq!(report.archived, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(repo.store().archived_len().await, 1);

    let remaining = repo.get_history(record.id).await.expect("history");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].version, 2);
}

#[tokio::test]
async fn archive_with_unbounded_window_archives_nothing() {
    let record = supplier("Ancient History");
    let repo = repository_with(vec![record.clone()], ResilienceConfig::default()).await;
    repo.upsert_analysis(record.id, &analysis_for(&record))
        .await
        .expect("upsert");

    let report = repo.archive_older_than(u32::MAX).await.expect("archive");
    assert_eq!(report.cutoff, chrono::DateTime::UNIX_EPOCH);
    assert_eq!(report.archived, 0);
    assert_eq!(report.deleted, 0);
    assert_eq!(repo.store().archived_len().await, 0);
}

#[tokio::test]
async fn archived_supplier_stops_accepting_analyses() {
    let kept = supplier("Kept");
    let retired = supplier("Retired");
    let repo = repository_with(
        vec![kept.clone(), retired.clone()],
        ResilienceConfig::default(),
    )
    .await;
    repo.upsert_analysis(retired.id, &analysis_for(&retired))
        .await
        .expect("upsert before archival");

    let archived_at = repo.archive_supplier(retired.id).await.expect("archive");
    let again = repo.archive_supplier(retired.id).await.expect("idempotent");
    assert_eq!(again, archived_at);

    let err = repo
        .upsert_analysis(retired.id, &analysis_for(&retired))
        .await
        .expect_err("archived supplier rejects analyses");
    assert!(matches!(err, StoreError::NotFound(id) if id == retired.id));

    let stored = repo
        .store()
        .fetch_supplier(retired.id)
        .await
        .expect("fetch")
        .expect("suppliers are never deleted");
    assert_eq!(stored.archived_at, Some(archived_at));
    assert_eq!(
        repo.get_history(retired.id).await.expect("history").len(),
        1
    );

    let stats = repo.statistics().await.expect("statistics");
    assert_eq!(stats.total_suppliers, 1);
    assert_eq!(stats.analyzed_count, 0);
}

#[tokio::test]
async fn archiving_unknown_supplier_is_not_found() {
    let repo = repository_with(vec![], ResilienceConfig::default()).await;
    let missing = Uuid::new_v4();
    let err = repo
        .archive_supplier(missing)
        .await
        .expect_err("nothing to archive");
    assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    assert_eq!(repo.breaker_state().await.consecutive_failures, 0);
}

#[tokio::test]
async fn put_supplier_round_trips_archival_state() {
    let repo = repository_with(vec![], ResilienceConfig::default()).await;
    let mut record = supplier("Imported Retiree");
    record.archived_at = Some(Utc::now());

    let op = repo.put_supplier(&record).await.expect("put");
    assert_eq!(op, UpsertOperation::Inserted);
    let stored = repo.get_supplier(record.id).await.expect("fetch");
    assert_eq!(stored.archived_at, record.archived_at);
}

#[tokio::test]
async fn statistics_cover_active_suppliers() {
    let analyzed = supplier("Analyzed");
    let pending = supplier("Pending");
    let repo = repository_with(
        vec![analyzed.clone(), pending.clone()],
        ResilienceConfig::default(),
    )
    .await;
    let result = analysis_for(&analyzed);
    repo.upsert_analysis(analyzed.id, &result)
        .await
        .expect("upsert");

    let stats = repo.statistics().await.expect("statistics");
    assert_eq!(stats.total_suppliers, 2);
    assert_eq!(stats.analyzed_count, 1);
    assert_eq!(stats.recent_count, 1);
    let avg = stats.avg_credibility.expect("one analyzed supplier");
    assert!((avg - result.credibility.score).abs() < 1e-9);
}

#[tokio::test]
async fn audit_log_is_bounded() {
    let record = supplier("Chatty");
    let repo = repository_with(
        vec![record.clone()],
        ResilienceConfig {
            audit_capacity: 2,
            cache_ttl: Duration::ZERO,
            ..ResilienceConfig::default()
        },
    )
    .await;

    for _ in 0..5 {
        repo.get_supplier(record.id).await.expect("read");
    }
    assert_eq!(repo.audit_log().await.len(), 2);
}
