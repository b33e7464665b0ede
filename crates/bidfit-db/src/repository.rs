//! Resilient access to a [`SupplierStore`].
//!
//! Every call passes through the same pipeline: circuit breaker check, the
//! operation with retry and schema self-healing, breaker bookkeeping, then an
//! audit entry. Reads are additionally served from a TTL cache.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use uuid::Uuid;

use bidfit_core::{AnalysisResult, AppConfig, SupplierRecord};

use crate::audit::{AuditEntry, AuditLog};
use crate::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::cache::{CacheStats, QueryCache};
use crate::error::StoreError;
use crate::retry::{run_with_recovery, RetryPolicy};
use crate::store::{
    ArchiveReport, HistoryEntry, SupplierStatistics, SupplierStore, UpsertOperation,
    UpsertOutcome,
};
use crate::validate::{validate_analysis, ValidationReport};

/// Window for [`SupplierStatistics::recent_count`].
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResilienceConfig {
    pub cache_ttl: Duration,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub retry: RetryPolicy,
    pub audit_capacity: usize,
    /// Maximum snapshots returned by [`ResilientRepository::get_history`].
    pub history_limit: i64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            breaker_threshold: 3,
            breaker_cooldown: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            audit_capacity: 1000,
            history_limit: 50,
        }
    }
}

impl ResilienceConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            breaker_threshold: config.breaker_threshold,
            breaker_cooldown: Duration::from_secs(config.breaker_cooldown_secs),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base: Duration::from_secs(config.retry_backoff_base_secs),
            },
            audit_capacity: config.audit_capacity,
            ..Self::default()
        }
    }
}

/// Values held by the read cache.
#[derive(Debug, Clone)]
enum CachedRead {
    Supplier(Box<SupplierRecord>),
    History(Vec<HistoryEntry>),
    Statistics(SupplierStatistics),
}

/// `now - days`, floored at the Unix epoch. No analysis predates it, and the
/// floor keeps the bound inside every backend's timestamp range.
pub(crate) fn retention_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .map_or(DateTime::UNIX_EPOCH, |cutoff| cutoff.max(DateTime::UNIX_EPOCH))
}

pub struct ResilientRepository<S> {
    store: S,
    config: ResilienceConfig,
    cache: QueryCache<CachedRead>,
    breaker: CircuitBreaker,
    audit: AuditLog,
}

impl<S: SupplierStore> ResilientRepository<S> {
    #[must_use]
    pub fn new(store: S, config: ResilienceConfig) -> Self {
        Self {
            cache: QueryCache::new(config.cache_ttl),
            breaker: CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown),
            audit: AuditLog::new(config.audit_capacity),
            store,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Run one guarded store operation and audit the outcome.
    async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        subject: Option<Uuid>,
        op: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        if let Err(err) = self.breaker.check().await {
            tracing::warn!(operation, error = %err, "rejected by open circuit breaker");
            self.audit
                .record(
                    AuditEntry::new(operation, subject, false)
                        .with("retries", 0)
                        .with("error", err.to_string()),
                )
                .await;
            return Err(err);
        }

        let started = Instant::now();
        let attempted = run_with_recovery(&self.store, self.config.retry, operation, op).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut entry = AuditEntry::new(operation, subject, attempted.result.is_ok())
            .with("retries", attempted.retries)
            .with("duration_ms", duration_ms);
        if attempted.healed {
            entry = entry.with("self_healed", true);
        }

        match &attempted.result {
            Ok(_) => self.breaker.record_success().await,
            Err(err) => {
                // A caller or data error still proves the store answered.
                if err.counts_against_breaker() {
                    self.breaker.record_failure().await;
                } else {
                    self.breaker.record_success().await;
                }
                entry = entry.with("error", err.to_string());
            }
        }
        self.audit.record(entry).await;

        attempted.result
    }

    /// Audit a read answered from the cache without touching the store.
    async fn record_cache_hit(&self, operation: &'static str, subject: Option<Uuid>) {
        tracing::debug!(operation, "served from cache");
        self.audit
            .record(
                AuditEntry::new(operation, subject, true)
                    .with("retries", 0)
                    .with("cached", true),
            )
            .await;
    }

    /// Load a supplier, serving repeat reads from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such supplier exists, or the
    /// store error once retries are exhausted.
    pub async fn get_supplier(&self, id: Uuid) -> Result<SupplierRecord, StoreError> {
        let key = format!("supplier:{id}");
        if let Some(CachedRead::Supplier(record)) = self.cache.get(&key).await {
            self.record_cache_hit("get_supplier", Some(id)).await;
            return Ok(*record);
        }

        let found = self
            .execute("get_supplier", Some(id), || self.store.fetch_supplier(id))
            .await?;
        let record = found.ok_or(StoreError::NotFound(id))?;
        self.cache
            .insert(key, CachedRead::Supplier(Box::new(record.clone())))
            .await;
        Ok(record)
    }

    /// Insert or replace a supplier's declared attributes.
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn put_supplier(
        &self,
        supplier: &SupplierRecord,
    ) -> Result<UpsertOperation, StoreError> {
        self.execute("put_supplier", Some(supplier.id), || {
            self.store.put_supplier(supplier)
        })
        .await
    }

    /// Archive a supplier. It keeps its history but stops accepting analyses
    /// and drops out of the statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such supplier exists, or the
    /// store error once retries are exhausted.
    pub async fn archive_supplier(&self, id: Uuid) -> Result<DateTime<Utc>, StoreError> {
        let archived_at = self
            .execute("archive_supplier", Some(id), || self.store.archive_supplier(id))
            .await?;
        tracing::info!(supplier_id = %id, %archived_at, "supplier archived");
        Ok(archived_at)
    }

    /// Validate an analysis payload. Never fails.
    #[must_use]
    pub fn validate(&self, payload: &Value) -> ValidationReport {
        validate_analysis(payload, Utc::now())
    }

    /// Validate and persist an analysis for `supplier_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] without touching the store when
    /// validation finds errors, [`StoreError::NotFound`] when the supplier is
    /// archived, or the store error once retries are exhausted.
    pub async fn upsert_analysis(
        &self,
        supplier_id: Uuid,
        analysis: &AnalysisResult,
    ) -> Result<UpsertOutcome, StoreError> {
        let payload = serde_json::to_value(analysis).map_err(|source| {
            StoreError::Serialization {
                context: "analysis payload",
                source,
            }
        })?;
        let mut report = self.validate(&payload);
        if analysis.supplier_id != supplier_id {
            report.errors.push(format!(
                "analysis belongs to supplier {} but was written to {supplier_id}",
                analysis.supplier_id
            ));
        }
        if !report.errors.is_empty() {
            tracing::warn!(
                %supplier_id,
                errors = ?report.errors,
                "refusing to persist invalid analysis"
            );
            self.audit
                .record(
                    AuditEntry::new("upsert_analysis", Some(supplier_id), false)
                        .with("retries", 0)
                        .with("validation_errors", report.errors.clone()),
                )
                .await;
            return Err(StoreError::InvalidPayload(report.errors));
        }
        if !report.warnings.is_empty() {
            tracing::info!(%supplier_id, warnings = ?report.warnings, "analysis has warnings");
        }

        self.execute("upsert_analysis", Some(supplier_id), || {
            self.store.upsert_analysis(supplier_id, analysis)
        })
        .await
    }

    /// Persist several analyses. Each item succeeds or fails on its own; the
    /// results are in input order.
    pub async fn batch_upsert(
        &self,
        items: &[(Uuid, AnalysisResult)],
    ) -> Vec<Result<UpsertOutcome, StoreError>> {
        let mut results = Vec::with_capacity(items.len());
        for (supplier_id, analysis) in items {
            results.push(self.upsert_analysis(*supplier_id, analysis).await);
        }
        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(total = items.len(), failed, "batch upsert finished");
        results
    }

    /// Stored snapshots for a supplier, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn get_history(&self, supplier_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        let key = format!("history:{supplier_id}:{}", self.config.history_limit);
        if let Some(CachedRead::History(entries)) = self.cache.get(&key).await {
            self.record_cache_hit("get_history", Some(supplier_id)).await;
            return Ok(entries);
        }

        let limit = self.config.history_limit;
        let entries = self
            .execute("get_history", Some(supplier_id), || {
                self.store.fetch_history(supplier_id, limit)
            })
            .await?;
        self.cache
            .insert(key, CachedRead::History(entries.clone()))
            .await;
        Ok(entries)
    }

    /// Aggregate statistics over active suppliers.
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn statistics(&self) -> Result<SupplierStatistics, StoreError> {
        let key = "statistics";
        if let Some(CachedRead::Statistics(stats)) = self.cache.get(key).await {
            self.record_cache_hit("statistics", None).await;
            return Ok(stats);
        }

        let since = Utc::now() - TimeDelta::days(RECENT_WINDOW_DAYS);
        let stats = self
            .execute("statistics", None, || self.store.statistics(since))
            .await?;
        self.cache
            .insert(key, CachedRead::Statistics(stats.clone()))
            .await;
        Ok(stats)
    }

    /// Archive history older than `days` days. Windows reaching back past
    /// 1970 archive nothing.
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn archive_older_than(&self, days: u32) -> Result<ArchiveReport, StoreError> {
        let cutoff = retention_cutoff(Utc::now(), days);
        let report = self
            .execute("archive", None, || self.store.archive_before(cutoff))
            .await?;
        tracing::info!(
            %cutoff,
            archived = report.archived,
            deleted = report.deleted,
            "history archived"
        );
        Ok(report)
    }

    /// Record an event that did not go through the store, such as an
    /// analysis-level fallback.
    pub async fn record_event(&self, entry: AuditEntry) {
        self.audit.record(entry).await;
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.snapshot().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn breaker_state(&self) -> BreakerSnapshot {
        self.breaker.snapshot().await
    }
}
