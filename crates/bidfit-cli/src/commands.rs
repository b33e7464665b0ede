//! Command handlers for the CLI.
//!
//! Handlers print JSON to stdout so runs can be piped into other tools.
//! Per-supplier failures inside a batch or import are reported, not
//! propagated.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use uuid::Uuid;

use bidfit_analysis::Analyzer;
use bidfit_core::{AppConfig, EnrichmentPayload, ScoringThresholds, SupplierRecord};
use bidfit_db::{PgSupplierStore, ResilienceConfig, ResilientRepository, UpsertOperation};
use bidfit_pipeline::{AnalysisService, BatchStatus, ServiceConfig};

pub(crate) type Service = AnalysisService<PgSupplierStore>;

/// Wire the Postgres store, resilience layer and analyzer together.
///
/// # Errors
///
/// Returns an error if a configured scoring thresholds file cannot be loaded.
pub(crate) fn build_service(pool: sqlx::PgPool, config: &AppConfig) -> anyhow::Result<Service> {
    let thresholds = match &config.scoring_path {
        Some(path) => bidfit_core::load_scoring_thresholds(path)
            .with_context(|| format!("loading scoring thresholds from {}", path.display()))?,
        None => ScoringThresholds::default(),
    };
    let repository = ResilientRepository::new(
        PgSupplierStore::new(pool),
        ResilienceConfig::from_app_config(config),
    );
    Ok(AnalysisService::new(
        repository,
        Analyzer::new(thresholds),
        ServiceConfig::from_app_config(config),
    ))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// db
// ---------------------------------------------------------------------------

pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    bidfit_db::ping(pool).await?;
    println!("database reachable");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = bidfit_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

// ---------------------------------------------------------------------------
// analysis
// ---------------------------------------------------------------------------

async fn read_enrichment(path: &Path) -> anyhow::Result<EnrichmentPayload> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading enrichment file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing enrichment file {}", path.display()))
}

pub(crate) async fn run_analyze(
    service: &Service,
    supplier_id: Uuid,
    enrichment: Option<&Path>,
) -> anyhow::Result<()> {
    let enrichment = match enrichment {
        Some(path) => Some(read_enrichment(path).await?),
        None => None,
    };
    let result = service.analyze_supplier(supplier_id, enrichment).await?;
    print_json(&result)
}

/// # Errors
///
/// Returns an error only if the output cannot be serialized, or if every
/// supplier in the batch failed.
pub(crate) async fn run_batch(service: &Service, supplier_ids: &[Uuid]) -> anyhow::Result<()> {
    let envelopes = service.batch_analyze(supplier_ids).await;
    print_json(&envelopes)?;

    let failed = envelopes
        .iter()
        .filter(|e| e.status == BatchStatus::Failed)
        .count();
    if failed > 0 {
        eprintln!("{failed} of {} supplier(s) failed", envelopes.len());
    }
    if failed == envelopes.len() && !envelopes.is_empty() {
        anyhow::bail!("every supplier in the batch failed");
    }
    Ok(())
}

pub(crate) async fn run_history(service: &Service, supplier_id: Uuid) -> anyhow::Result<()> {
    let history = service.get_history(supplier_id).await?;
    print_json(&history)
}

pub(crate) async fn run_stats(service: &Service) -> anyhow::Result<()> {
    let stats = service.get_statistics().await?;
    print_json(&stats)
}

pub(crate) async fn run_retire(service: &Service, supplier_id: Uuid) -> anyhow::Result<()> {
    let archived_at = service.retire_supplier(supplier_id).await?;
    print_json(&serde_json::json!({
        "supplier_id": supplier_id,
        "archived_at": archived_at,
    }))
}

pub(crate) async fn run_archive(service: &Service, retention_days: u32) -> anyhow::Result<()> {
    let report = service.archive_history(retention_days).await?;
    print_json(&report)
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
struct ImportSummary {
    inserted: usize,
    updated: usize,
    failed: usize,
}

pub(crate) fn parse_suppliers(raw: &str) -> anyhow::Result<Vec<SupplierRecord>> {
    serde_json::from_str(raw).context("expected a JSON array of supplier records")
}

pub(crate) async fn run_import(service: &Service, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading supplier file {}", path.display()))?;
    let suppliers = parse_suppliers(&raw)?;

    let mut summary = ImportSummary::default();
    for supplier in &suppliers {
        match service.repository().put_supplier(supplier).await {
            Ok(UpsertOperation::Inserted) => summary.inserted += 1,
            Ok(UpsertOperation::Updated) => summary.updated += 1,
            Err(e) => {
                tracing::warn!(supplier_id = %supplier.id, error = %e, "supplier import failed");
                summary.failed += 1;
            }
        }
    }
    print_json(&summary)
}
