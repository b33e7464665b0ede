//! The storage seam: the operations the repository needs from a backend, and
//! the records they exchange.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bidfit_core::{AnalysisResult, SupplierRecord};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOperation {
    Inserted,
    Updated,
}

/// Result of writing an analysis for a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Business key of the supplier row that was written.
    pub handle: Uuid,
    pub operation: UpsertOperation,
    /// History version assigned to the stored snapshot, starting at 1.
    pub version: i32,
}

/// One stored analysis snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub analysis_id: Uuid,
    pub supplier_id: Uuid,
    pub version: i32,
    pub status: String,
    pub credibility_score: f64,
    pub confidence: f64,
    pub analyzed_at: DateTime<Utc>,
    pub snapshot: AnalysisResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub cutoff: DateTime<Utc>,
    /// Rows copied into the archive table.
    pub archived: u64,
    /// Rows removed from the live history table.
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierStatistics {
    pub total_suppliers: i64,
    pub analyzed_count: i64,
    pub avg_credibility: Option<f64>,
    pub avg_confidence: Option<f64>,
    /// Suppliers analyzed since the `recent_since` bound of the query.
    pub recent_count: i64,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A backend holding supplier records and their analysis history.
///
/// Implementations perform a single attempt per call. Retries, caching and
/// circuit breaking live in [`crate::ResilientRepository`].
#[async_trait]
pub trait SupplierStore: Send + Sync + 'static {
    /// Load a supplier by id. Archived suppliers are returned as stored.
    async fn fetch_supplier(&self, id: Uuid) -> Result<Option<SupplierRecord>, StoreError>;

    /// Insert or replace the declared attributes and archival state of a
    /// supplier.
    async fn put_supplier(&self, supplier: &SupplierRecord)
        -> Result<UpsertOperation, StoreError>;

    /// Mark a supplier archived and return when that happened. Archiving an
    /// archived supplier keeps the original timestamp. Suppliers are never
    /// deleted.
    ///
    /// Returns [`StoreError::NotFound`] when no such supplier exists.
    async fn archive_supplier(&self, id: Uuid) -> Result<DateTime<Utc>, StoreError>;

    /// Record an analysis: update the supplier's denormalized scores (creating
    /// the supplier row if absent) and append a history snapshot.
    ///
    /// Returns [`StoreError::NotFound`] when the supplier row exists but is
    /// archived and so cannot be updated.
    async fn upsert_analysis(
        &self,
        supplier_id: Uuid,
        analysis: &AnalysisResult,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Most recent history entries first, at most `limit`.
    async fn fetch_history(
        &self,
        supplier_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Move history rows analyzed before `cutoff` into the archive.
    async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<ArchiveReport, StoreError>;

    async fn statistics(&self, recent_since: DateTime<Utc>)
        -> Result<SupplierStatistics, StoreError>;

    /// (Re)create any missing tables and indexes. Idempotent.
    async fn bootstrap(&self) -> Result<(), StoreError>;
}
