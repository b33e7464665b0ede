//! Postgres-backed [`SupplierStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bidfit_core::{AnalysisResult, SupplierRecord};

use crate::error::StoreError;
use crate::store::{
    ArchiveReport, HistoryEntry, SupplierStatistics, SupplierStore, UpsertOperation,
    UpsertOutcome,
};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `suppliers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub capabilities: Vec<String>,
    pub industries: Vec<String>,
    pub team_size: Option<i32>,
    pub years_experience: Option<f64>,
    pub project_count: Option<i32>,
    pub location: Option<String>,
    pub credibility_score: Option<f64>,
    pub confidence: Option<f64>,
    /// JSONB array of source labels.
    pub data_sources: serde_json::Value,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl SupplierRow {
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `data_sources` is not an array
    /// of strings.
    pub fn into_record(self) -> Result<SupplierRecord, StoreError> {
        let data_sources: Vec<String> =
            serde_json::from_value(self.data_sources).map_err(|source| {
                StoreError::Serialization {
                    context: "suppliers.data_sources",
                    source,
                }
            })?;

        Ok(SupplierRecord {
            id: self.id,
            name: self.name,
            capabilities: self.capabilities,
            industries: self.industries,
            team_size: self.team_size.and_then(|v| u32::try_from(v).ok()),
            years_experience: self.years_experience,
            project_count: self.project_count.and_then(|v| u32::try_from(v).ok()),
            location: self.location,
            credibility_score: self.credibility_score,
            confidence: self.confidence,
            data_sources,
            last_analyzed_at: self.last_analyzed_at,
            archived_at: self.archived_at,
        })
    }
}

/// A row from the `supplier_analyses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: i64,
    pub public_id: Uuid,
    pub supplier_id: Uuid,
    pub version: i32,
    pub status: String,
    pub credibility_score: f64,
    pub confidence: f64,
    pub snapshot: serde_json::Value,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRow {
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the snapshot no longer matches
    /// the analysis schema.
    pub fn into_entry(self) -> Result<HistoryEntry, StoreError> {
        let snapshot: AnalysisResult =
            serde_json::from_value(self.snapshot).map_err(|source| {
                StoreError::Serialization {
                    context: "supplier_analyses.snapshot",
                    source,
                }
            })?;

        Ok(HistoryEntry {
            analysis_id: self.public_id,
            supplier_id: self.supplier_id,
            version: self.version,
            status: self.status,
            credibility_score: self.credibility_score,
            confidence: self.confidence,
            analyzed_at: self.analyzed_at,
            snapshot,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StatisticsRow {
    total_suppliers: i64,
    analyzed_count: i64,
    avg_credibility: Option<f64>,
    avg_confidence: Option<f64>,
    recent_count: i64,
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

fn status_label(analysis: &AnalysisResult) -> &'static str {
    match analysis.status {
        bidfit_core::AnalysisStatus::Success => "success",
        bidfit_core::AnalysisStatus::PartialSuccess => "partial_success",
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgSupplierStore {
    pool: PgPool,
}

impl PgSupplierStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SupplierStore for PgSupplierStore {
    async fn fetch_supplier(&self, id: Uuid) -> Result<Option<SupplierRecord>, StoreError> {
        let row = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, capabilities, industries, team_size, years_experience, \
                    project_count, location, credibility_score, confidence, data_sources, \
                    last_analyzed_at, archived_at \
             FROM suppliers \
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SupplierRow::into_record).transpose()
    }

    async fn put_supplier(
        &self,
        supplier: &SupplierRecord,
    ) -> Result<UpsertOperation, StoreError> {
        let data_sources = serde_json::to_value(&supplier.data_sources).map_err(|source| {
            StoreError::Serialization {
                context: "suppliers.data_sources",
                source,
            }
        })?;

        // `xmax = 0` holds only for rows created by this statement.
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO suppliers (id, name, capabilities, industries, team_size, \
                                    years_experience, project_count, location, data_sources, \
                                    archived_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                capabilities = EXCLUDED.capabilities, \
                industries = EXCLUDED.industries, \
                team_size = EXCLUDED.team_size, \
                years_experience = EXCLUDED.years_experience, \
                project_count = EXCLUDED.project_count, \
                location = EXCLUDED.location, \
                data_sources = EXCLUDED.data_sources, \
                archived_at = EXCLUDED.archived_at, \
                updated_at = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(supplier.id)
        .bind(supplier.name.as_deref())
        .bind(&supplier.capabilities)
        .bind(&supplier.industries)
        .bind(to_i32(supplier.team_size))
        .bind(supplier.years_experience)
        .bind(to_i32(supplier.project_count))
        .bind(supplier.location.as_deref())
        .bind(data_sources)
        .bind(supplier.archived_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOperation::Inserted
        } else {
            UpsertOperation::Updated
        })
    }

    async fn archive_supplier(&self, id: Uuid) -> Result<DateTime<Utc>, StoreError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE suppliers \
             SET archived_at = COALESCE(archived_at, NOW()), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING archived_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn upsert_analysis(
        &self,
        supplier_id: Uuid,
        analysis: &AnalysisResult,
    ) -> Result<UpsertOutcome, StoreError> {
        let snapshot = serde_json::to_value(analysis).map_err(|source| {
            StoreError::Serialization {
                context: "supplier_analyses.snapshot",
                source,
            }
        })?;
        let data_sources = serde_json::to_value(&analysis.data_sources).map_err(|source| {
            StoreError::Serialization {
                context: "suppliers.data_sources",
                source,
            }
        })?;
        let name = Some(analysis.supplier_name.as_str()).filter(|n| !n.trim().is_empty());

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM suppliers WHERE id = $1 FOR UPDATE",
        )
        .bind(supplier_id)
        .fetch_optional(&mut *tx)
        .await?;

        let operation = if existing.is_some() {
            let result = sqlx::query(
                "UPDATE suppliers \
                 SET credibility_score = $1, confidence = $2, data_sources = $3, \
                     last_analyzed_at = $4, updated_at = NOW() \
                 WHERE id = $5 AND archived_at IS NULL",
            )
            .bind(analysis.credibility.score)
            .bind(analysis.confidence)
            .bind(&data_sources)
            .bind(analysis.analyzed_at)
            .bind(supplier_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(supplier_id));
            }
            UpsertOperation::Updated
        } else {
            sqlx::query(
                "INSERT INTO suppliers (id, name, credibility_score, confidence, data_sources, \
                                        last_analyzed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(supplier_id)
            .bind(name)
            .bind(analysis.credibility.score)
            .bind(analysis.confidence)
            .bind(&data_sources)
            .bind(analysis.analyzed_at)
            .execute(&mut *tx)
            .await?;
            UpsertOperation::Inserted
        };

        // Versions continue across archival, so both tables are consulted.
        let version = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM ( \
                SELECT version FROM supplier_analyses WHERE supplier_id = $1 \
                UNION ALL \
                SELECT version FROM supplier_analyses_archive WHERE supplier_id = $1 \
             ) AS versions",
        )
        .bind(supplier_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO supplier_analyses (public_id, supplier_id, version, status, \
                                            credibility_score, confidence, snapshot, analyzed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(analysis.id)
        .bind(supplier_id)
        .bind(version)
        .bind(status_label(analysis))
        .bind(analysis.credibility.score)
        .bind(analysis.confidence)
        .bind(snapshot)
        .bind(analysis.analyzed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

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
        let rows = sqlx::query_as::<_, AnalysisRow>(
            "SELECT id, public_id, supplier_id, version, status, credibility_score, \
                    confidence, snapshot, analyzed_at \
             FROM supplier_analyses \
             WHERE supplier_id = $1 \
             ORDER BY analyzed_at DESC, version DESC \
             LIMIT $2",
        )
        .bind(supplier_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AnalysisRow::into_entry).collect()
    }

    async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<ArchiveReport, StoreError> {
        let mut tx = self.pool.begin().await?;

        let archived_ids = sqlx::query_scalar::<_, i64>(
            "INSERT INTO supplier_analyses_archive (id, public_id, supplier_id, version, status, \
                                                    credibility_score, confidence, snapshot, \
                                                    analyzed_at, created_at) \
             SELECT id, public_id, supplier_id, version, status, credibility_score, confidence, \
                    snapshot, analyzed_at, created_at \
             FROM supplier_analyses \
             WHERE analyzed_at < $1 \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        // Only rows confirmed in the archive are removed.
        let deleted = sqlx::query("DELETE FROM supplier_analyses WHERE id = ANY($1)")
            .bind(&archived_ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(ArchiveReport {
            cutoff,
            archived: archived_ids.len() as u64,
            deleted,
        })
    }

    async fn statistics(
        &self,
        recent_since: DateTime<Utc>,
    ) -> Result<SupplierStatistics, StoreError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            "SELECT COUNT(*) AS total_suppliers, \
                    COUNT(last_analyzed_at) AS analyzed_count, \
                    AVG(credibility_score) AS avg_credibility, \
                    AVG(confidence) AS avg_confidence, \
                    COUNT(*) FILTER (WHERE last_analyzed_at >= $1) AS recent_count \
             FROM suppliers \
             WHERE archived_at IS NULL",
        )
        .bind(recent_since)
        .fetch_one(&self.pool)
        .await?;

        Ok(SupplierStatistics {
            total_suppliers: row.total_suppliers,
            analyzed_count: row.analyzed_count,
            avg_credibility: row.avg_credibility,
            avg_confidence: row.avg_confidence,
            recent_count: row.recent_count,
        })
    }

    async fn bootstrap(&self) -> Result<(), StoreError> {
        crate::bootstrap_schema(&self.pool).await
    }
}
