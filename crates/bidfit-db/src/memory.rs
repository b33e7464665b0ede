//! In-process [`SupplierStore`] for tests and dry runs.
//!
//! Mirrors the Postgres semantics (versioned append-only history, archival,
//! archived suppliers rejecting updates) and supports fault injection: queued
//! [`Fault`]s are returned by the next calls in order, and
//! [`MemoryStore::drop_schema`] makes every call report missing structure
//! until [`SupplierStore::bootstrap`] runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use bidfit_core::{AnalysisResult, AnalysisStatus, SupplierRecord};

use crate::error::StoreError;
use crate::store::{
    ArchiveReport, HistoryEntry, SupplierStatistics, SupplierStore, UpsertOperation,
    UpsertOutcome,
};

/// Failure modes that can be injected into a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Deadlock,
    ConnectionLost,
    MissingStructure,
    /// A non-transient driver failure.
    Fatal,
}

impl Fault {
    fn into_error(self) -> StoreError {
        match self {
            Fault::Timeout => StoreError::Timeout,
            Fault::Deadlock => StoreError::Deadlock("deadlock detected".to_string()),
            Fault::ConnectionLost => {
                StoreError::ConnectionLost("connection reset by peer".to_string())
            }
            Fault::MissingStructure => {
                StoreError::MissingStructure("relation \"suppliers\" does not exist".to_string())
            }
            Fault::Fatal => StoreError::Sqlx(sqlx::Error::Protocol(
                "injected fatal failure".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    suppliers: HashMap<Uuid, SupplierRecord>,
    history: Vec<HistoryEntry>,
    archive: Vec<HistoryEntry>,
    schema_missing: bool,
    faults: VecDeque<Fault>,
}

impl MemoryState {
    fn next_version(&self, supplier_id: Uuid) -> i32 {
        self.history
            .iter()
            .chain(self.archive.iter())
            .filter(|e| e.supplier_id == supplier_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    calls: AtomicU32,
    bootstraps: AtomicU32,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed suppliers without going through the repository.
    pub async fn with_suppliers(suppliers: impl IntoIterator<Item = SupplierRecord>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for supplier in suppliers {
                state.suppliers.insert(supplier.id, supplier);
            }
        }
        store
    }

    /// Queue `fault` to be returned by the next `times` calls.
    pub async fn inject(&self, fault: Fault, times: usize) {
        let mut state = self.state.lock().await;
        state.faults.extend(std::iter::repeat_n(fault, times));
    }

    /// Simulate the tables disappearing.
    pub async fn drop_schema(&self) {
        self.state.lock().await.schema_missing = true;
    }

    /// Insert a history entry directly, e.g. one dated in the past.
    pub async fn insert_history(&self, entry: HistoryEntry) {
        self.state.lock().await.history.push(entry);
    }

    pub async fn archived_len(&self) -> usize {
        self.state.lock().await.archive.len()
    }

    /// Calls that reached the store, including failed ones.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn bootstrap_count(&self) -> u32 {
        self.bootstraps.load(Ordering::SeqCst)
    }

    /// Count the call and surface any pending fault.
    fn enter(&self, state: &mut MemoryState) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = state.faults.pop_front() {
            return Err(fault.into_error());
        }
        if state.schema_missing {
            return Err(Fault::MissingStructure.into_error());
        }
        Ok(())
    }
}

#[async_trait]
impl SupplierStore for MemoryStore {
    async fn fetch_supplier(&self, id: Uuid) -> Result<Option<SupplierRecord>, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;
        Ok(state.suppliers.get(&id).cloned())
    }

    async fn put_supplier(
        &self,
        supplier: &SupplierRecord,
    ) -> Result<UpsertOperation, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;
        Ok(match state.suppliers.insert(supplier.id, supplier.clone()) {
            Some(_) => UpsertOperation::Updated,
            None => UpsertOperation::Inserted,
        })
    }

    async fn archive_supplier(&self, id: Uuid) -> Result<DateTime<Utc>, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;
        let supplier = state
            .suppliers
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(*supplier.archived_at.get_or_insert_with(Utc::now))
    }

    async fn upsert_analysis(
        &self,
        supplier_id: Uuid,
        analysis: &AnalysisResult,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;

        let operation = match state.suppliers.get_mut(&supplier_id) {
            Some(existing) if existing.archived_at.is_some() => {
                return Err(StoreError::NotFound(supplier_id));
            }
            Some(existing) => {
                existing.credibility_score = Some(analysis.credibility.score);
                existing.confidence = Some(analysis.confidence);
                existing.data_sources.clone_from(&analysis.data_sources);
                existing.last_analyzed_at = Some(analysis.analyzed_at);
                UpsertOperation::Updated
            }
            None => {
                let mut created = SupplierRecord::new(supplier_id, analysis.supplier_name.clone());
                if analysis.supplier_name.trim().is_empty() {
                    created.name = None;
                }
                created.credibility_score = Some(analysis.credibility.score);
                created.confidence = Some(analysis.confidence);
                created.data_sources.clone_from(&analysis.data_sources);
                created.last_analyzed_at = Some(analysis.analyzed_at);
                state.suppliers.insert(supplier_id, created);
                UpsertOperation::Inserted
            }
        };

        let version = state.next_version(supplier_id);
        state.history.push(HistoryEntry {
            analysis_id: analysis.id,
            supplier_id,
            version,
            status: match analysis.status {
                AnalysisStatus::Success => "success",
                AnalysisStatus::PartialSuccess => "partial_success",
            }
            .to_string(),
            credibility_score: analysis.credibility.score,
            confidence: analysis.confidence,
            analyzed_at: analysis.analyzed_at,
            snapshot: analysis.clone(),
        });

        Ok(UpsertOutcome {
            handle: supplier_id,
            operation,
            version,
        })
    }

    async fn fetch_history(
        &self,
        supplier_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;

        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|e| e.supplier_id == supplier_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.analyzed_at
                .cmp(&a.analyzed_at)
                .then(b.version.cmp(&a.version))
        });
        entries.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<ArchiveReport, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;

        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.history)
            .into_iter()
            .partition(|e| e.analyzed_at < cutoff);
        let moved = expired.len() as u64;
        state.history = kept;
        state.archive.extend(expired);

        Ok(ArchiveReport {
            cutoff,
            archived: moved,
            deleted: moved,
        })
    }

    async fn statistics(
        &self,
        recent_since: DateTime<Utc>,
    ) -> Result<SupplierStatistics, StoreError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state)?;

        let active: Vec<&SupplierRecord> = state
            .suppliers
            .values()
            .filter(|s| s.archived_at.is_none())
            .collect();
        let mean = |values: Vec<f64>| {
            #[allow(clippy::cast_precision_loss)]
            let n = values.len() as f64;
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / n)
        };

        Ok(SupplierStatistics {
            total_suppliers: i64::try_from(active.len()).unwrap_or(i64::MAX),
            analyzed_count: i64::try_from(
                active.iter().filter(|s| s.last_analyzed_at.is_some()).count(),
            )
            .unwrap_or(i64::MAX),
            avg_credibility: mean(active.iter().filter_map(|s| s.credibility_score).collect()),
            avg_confidence: mean(active.iter().filter_map(|s| s.confidence).collect()),
            recent_count: i64::try_from(
                active
                    .iter()
                    .filter(|s| s.last_analyzed_at.is_some_and(|at| at >= recent_since))
                    .count(),
            )
            .unwrap_or(i64::MAX),
        })
    }

    async fn bootstrap(&self) -> Result<(), StoreError> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        self.state.lock().await.schema_missing = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn faults_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.inject(Fault::Timeout, 1).await;
        store.inject(Fault::Fatal, 1).await;

        assert!(matches!(
            store.fetch_supplier(Uuid::nil()).await,
            Err(StoreError::Timeout)
        ));
        assert!(matches!(
            store.fetch_supplier(Uuid::nil()).await,
            Err(StoreError::Sqlx(_))
        ));
        assert!(store.fetch_supplier(Uuid::nil()).await.is_ok());
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn dropped_schema_heals_on_bootstrap() {
        let store = MemoryStore::new();
        store.drop_schema().await;
        assert!(store
            .fetch_supplier(Uuid::nil())
            .await
            .is_err_and(|e| e.is_missing_structure()));

        store.bootstrap().await.expect("bootstrap succeeds");
        assert!(store.fetch_supplier(Uuid::nil()).await.is_ok());
    }

    #[tokio::test]
    async fn put_supplier_reports_operation() {
        let store = MemoryStore::new();
        let supplier = SupplierRecord::new(Uuid::new_v4(), "Acme");
        assert_eq!(
            store.put_supplier(&supplier).await.expect("insert"),
            UpsertOperation::Inserted
        );
        assert_eq!(
            store.put_supplier(&supplier).await.expect("update"),
            UpsertOperation::Updated
        );
    }
}
