use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use bidfit_analysis::{compare_snapshots, AnalysisDelta, Analyzer};
use bidfit_core::{AnalysisResult, AppConfig, EnrichmentPayload};
use bidfit_db::{
    ArchiveReport, AuditEntry, HistoryEntry, ResilientRepository, SupplierStatistics,
    SupplierStore,
};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Suppliers analyzed concurrently per micro-batch.
    pub batch_chunk_size: usize,
    /// Pause between micro-batches.
    pub batch_pause: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            batch_chunk_size: 5,
            batch_pause: Duration::from_millis(500),
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_chunk_size: config.batch_chunk_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Succeeded,
    Failed,
}

/// Per-supplier outcome of a batch run. Exactly one of `result` and `error`
/// is set.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEnvelope {
    pub supplier_id: Uuid,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEnvelope {
    fn from_outcome(supplier_id: Uuid, outcome: Result<AnalysisResult, ServiceError>) -> Self {
        match outcome {
            Ok(result) => Self {
                supplier_id,
                status: BatchStatus::Succeeded,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                supplier_id,
                status: BatchStatus::Failed,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Stored snapshots plus what changed between consecutive ones.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierHistory {
    pub supplier_id: Uuid,
    /// Newest first.
    pub entries: Vec<HistoryEntry>,
    /// `changes[i]` compares `entries[i + 1]` with `entries[i]`.
    pub changes: Vec<AnalysisDelta>,
}

pub struct AnalysisService<S> {
    repository: ResilientRepository<S>,
    analyzer: Analyzer,
    config: ServiceConfig,
}

impl<S: SupplierStore> AnalysisService<S> {
    #[must_use]
    pub fn new(repository: ResilientRepository<S>, analyzer: Analyzer, config: ServiceConfig) -> Self {
        Self {
            repository,
            analyzer,
            config,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &ResilientRepository<S> {
        &self.repository
    }

    /// Load, analyze and persist one supplier.
    ///
    /// The returned result may carry `partial_success`; it is persisted either
    /// way.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidSupplier`] if the stored record has no
    /// usable name, or [`ServiceError::Store`] if loading or persisting fails.
    pub async fn analyze_supplier(
        &self,
        supplier_id: Uuid,
        enrichment: Option<EnrichmentPayload>,
    ) -> Result<AnalysisResult, ServiceError> {
        let supplier = self.repository.get_supplier(supplier_id).await?;
        if supplier.display_name().is_none() {
            tracing::warn!(%supplier_id, "supplier record has no usable name");
            return Err(ServiceError::InvalidSupplier {
                id: supplier_id,
                reason: "name is missing or blank".to_string(),
            });
        }

        let result = self.analyzer.analyze(&supplier, enrichment.as_ref());
        if let Some(reason) = &result.credibility.fallback_reason {
            self.repository
                .record_event(
                    AuditEntry::new("credibility_fallback", Some(supplier_id), false)
                        .with("reason", reason.clone())
                        .with("fallback_score", result.credibility.score),
                )
                .await;
        }

        let outcome = self.repository.upsert_analysis(supplier_id, &result).await?;
        tracing::info!(
            %supplier_id,
            version = outcome.version,
            credibility = result.credibility.score,
            confidence = result.confidence,
            complete = result.is_complete(),
            "supplier analyzed"
        );
        Ok(result)
    }

    /// Analyze many suppliers in micro-batches. Returns one envelope per id, in
    /// input order; a failing supplier never aborts the batch.
    pub async fn batch_analyze(&self, supplier_ids: &[Uuid]) -> Vec<BatchEnvelope> {
        let chunk_size = self.config.batch_chunk_size.max(1);
        let chunk_count = supplier_ids.len().div_ceil(chunk_size);
        let mut envelopes = Vec::with_capacity(supplier_ids.len());

        for (index, chunk) in supplier_ids.chunks(chunk_size).enumerate() {
            if index > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }

            let results: Vec<BatchEnvelope> = stream::iter(chunk)
                .map(|&id| async move {
                    BatchEnvelope::from_outcome(id, self.analyze_supplier(id, None).await)
                })
                .buffered(chunk.len())
                .collect()
                .await;

            let failed = results
                .iter()
                .filter(|e| e.status == BatchStatus::Failed)
                .count();
            tracing::info!(
                chunk = index + 1,
                chunks = chunk_count,
                size = chunk.len(),
                failed,
                "batch chunk complete"
            );
            envelopes.extend(results);
        }

        envelopes
    }

    /// Stored history with consecutive-snapshot comparisons.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the history cannot be loaded.
    pub async fn get_history(&self, supplier_id: Uuid) -> Result<SupplierHistory, ServiceError> {
        let entries = self.repository.get_history(supplier_id).await?;
        let changes = entries
            .windows(2)
            .map(|pair| compare_snapshots(&pair[1].snapshot, &pair[0].snapshot))
            .collect();
        Ok(SupplierHistory {
            supplier_id,
            entries,
            changes,
        })
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the statistics query fails.
    pub async fn get_statistics(&self) -> Result<SupplierStatistics, ServiceError> {
        Ok(self.repository.statistics().await?)
    }

    /// Retire a supplier. Its history stays readable, new analyses are refused.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] with [`bidfit_db::StoreError::NotFound`] for an
    /// unknown supplier.
    pub async fn retire_supplier(&self, supplier_id: Uuid) -> Result<DateTime<Utc>, ServiceError> {
        Ok(self.repository.archive_supplier(supplier_id).await?)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if archival fails.
    pub async fn archive_history(&self, retention_days: u32) -> Result<ArchiveReport, ServiceError> {
        Ok(self.repository.archive_older_than(retention_days).await?)
    }
}
