//! End-to-end tests for `AnalysisService` over the in-memory store.

use std::time::Duration;

use bidfit_analysis::Analyzer;
use bidfit_core::{AnalysisStatus, EnrichmentPayload, SupplierRecord};
use bidfit_db::{Fault, MemoryStore, ResilienceConfig, ResilientRepository, StoreError};
use bidfit_pipeline::{AnalysisService, BatchStatus, ServiceConfig, ServiceError};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn supplier(name: &str) -> SupplierRecord {
    let mut record = SupplierRecord::new(Uuid::new_v4(), name);
    record.capabilities = vec!["Kubernetes".to_string(), "Data pipelines".to_string()];
    record.industries = vec!["Healthcare".to_string()];
    record.years_experience = Some(9.0);
    record.project_count = Some(28);
    record.team_size = Some(40);
    record
}

fn nameless() -> SupplierRecord {
    let mut record = supplier("placeholder");
    record.name = None;
    record
}

async fn service_with(
    suppliers: Vec<SupplierRecord>,
    config: ServiceConfig,
) -> AnalysisService<MemoryStore> {
    let store = MemoryStore::with_suppliers(suppliers).await;
    AnalysisService::new(
        ResilientRepository::new(store, ResilienceConfig::default()),
        Analyzer::default(),
        config,
    )
}

// ---------------------------------------------------------------------------
// Single supplier
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_supplier_persists_result() {
    let record = supplier("Northwind Systems");
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;

    let result = service
        .analyze_supplier(record.id, None)
        .await
        .expect("analysis succeeds");
    assert_eq!(result.supplier_id, record.id);
    assert_eq!(result.status, AnalysisStatus::Success);

    let history = service.get_history(record.id).await.expect("history");
    assert_eq!(history.entries.len(), 1);
    assert_eq!(history.entries[0].snapshot, result);
    assert!(history.changes.is_empty());
}

#[tokio::test]
async fn unknown_supplier_is_a_store_not_found() {
    let service = service_with(vec![], ServiceConfig::default()).await;
    let missing = Uuid::new_v4();

    let err = service
        .analyze_supplier(missing, None)
        .await
        .expect_err("unknown supplier");
    assert!(matches!(err, ServiceError::Store(StoreError::NotFound(id)) if id == missing));
}

#[tokio::test]
async fn nameless_supplier_is_rejected_before_analysis() {
    let record = nameless();
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;

    let err = service
        .analyze_supplier(record.id, None)
        .await
        .expect_err("nameless supplier");
    assert!(matches!(err, ServiceError::InvalidSupplier { id, .. } if id == record.id));
    let history = service.get_history(record.id).await.expect("history");
    assert!(history.entries.is_empty());
}

#[tokio::test]
async fn scorer_fallback_is_persisted_and_audited() {
    let mut record = supplier("Unmeasurable Ltd");
    record.years_experience = Some(f64::INFINITY);
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;

    let result = service
        .analyze_supplier(record.id, None)
        .await
        .expect("fallback still persists");
    assert_eq!(result.status, AnalysisStatus::PartialSuccess);
    assert!(result.credibility.fallback_reason.is_some());

    let audit = service.repository().audit_log().await;
    let fallback = audit
        .iter()
        .find(|e| e.operation == "credibility_fallback")
        .expect("fallback audited");
    assert_eq!(fallback.subject, Some(record.id));
    assert!(!fallback.success);
    assert!(audit
        .iter()
        .any(|e| e.operation == "upsert_analysis" && e.success));
}

#[tokio::test]
async fn transient_store_fault_is_retried_transparently() {
    let record = supplier("Flaky Network Co");
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;
    service
        .repository()
        .store()
        .inject(Fault::ConnectionLost, 1)
        .await;

    tokio::time::pause();
    let result = service.analyze_supplier(record.id, None).await;
    assert!(result.is_ok());
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn batch_returns_one_envelope_per_supplier_in_order() {
    let records = vec![
        supplier("Alpha"),
        supplier("Bravo"),
        nameless(),
        supplier("Delta"),
        supplier("Echo"),
    ];
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let config = ServiceConfig {
        batch_chunk_size: 2,
        batch_pause: Duration::from_millis(500),
    };
    let service = service_with(records, config).await;

    let started = tokio::time::Instant::now();
    let envelopes = service.batch_analyze(&ids).await;

    assert_eq!(envelopes.len(), ids.len());
    for (envelope, id) in envelopes.iter().zip(&ids) {
        assert_eq!(envelope.supplier_id, *id);
    }
    let failed: Vec<_> = envelopes
        .iter()
        .filter(|e| e.status == BatchStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].supplier_id, ids[2]);
    assert!(failed[0].result.is_none());
    assert!(failed[0].error.as_deref().is_some_and(|e| e.contains("name")));
    assert!(envelopes
        .iter()
        .filter(|e| e.status == BatchStatus::Succeeded)
        .all(|e| e.result.is_some() && e.error.is_none()));

    // Three chunks, two pauses between them.
    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let service = service_with(vec![], ServiceConfig::default()).await;
    assert!(service.batch_analyze(&[]).await.is_empty());
}

#[tokio::test]
async fn envelope_serialization_omits_absent_fields() {
    let record = nameless();
    let config = ServiceConfig {
        batch_chunk_size: 5,
        batch_pause: Duration::ZERO,
    };
    let service = service_with(vec![record.clone()], config).await;

    let envelopes = service.batch_analyze(&[record.id]).await;
    let json = serde_json::to_value(&envelopes[0]).expect("serializes");
    assert_eq!(json["status"], "failed");
    assert!(json.get("result").is_none());
    assert!(json["error"].is_string());
}

// ---------------------------------------------------------------------------
// History and statistics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_reports_changes_between_snapshots() {
    let record = supplier("Growing Vendor");
    let config = ServiceConfig::default();
    let store = MemoryStore::with_suppliers(vec![record.clone()]).await;
    let service = AnalysisService::new(
        ResilientRepository::new(
            store,
            ResilienceConfig {
                cache_ttl: Duration::ZERO,
                ..ResilienceConfig::default()
            },
        ),
        Analyzer::default(),
        config,
    );

    let first = service
        .analyze_supplier(record.id, None)
        .await
        .expect("first analysis");
    let enrichment = EnrichmentPayload {
        description: Some(
            "Cloud-native platform engineering for regulated healthcare providers.".to_string(),
        ),
        services: vec!["Machine learning".to_string()],
        certifications: vec!["ISO 27001".to_string(), "SOC 2".to_string()],
        testimonial_count: Some(12),
        ..EnrichmentPayload::default()
    };
    let second = service
        .analyze_supplier(record.id, Some(enrichment))
        .await
        .expect("second analysis");

    let history = service.get_history(record.id).await.expect("history");
    assert_eq!(history.entries.len(), 2);
    assert_eq!(history.entries[0].version, 2);
    assert_eq!(history.changes.len(), 1);

    let delta = &history.changes[0];
    assert_eq!(delta.previous_id, first.id);
    assert_eq!(delta.current_id, second.id);
    assert!(
        (delta.score_delta - (second.credibility.score - first.credibility.score)).abs() < 1e-9
    );
    assert!(delta.confidence_delta > 0.0);
}

#[tokio::test]
async fn statistics_reflect_analyzed_suppliers() {
    let analyzed = supplier("Analyzed Co");
    let pending = supplier("Pending Co");
    let service = service_with(
        vec![analyzed.clone(), pending.clone()],
        ServiceConfig::default(),
    )
    .await;

    let result = service
        .analyze_supplier(analyzed.id, None)
        .await
        .expect("analysis");
    let stats = service.get_statistics().await.expect("statistics");

    assert_eq!(stats.total_suppliers, 2);
    assert_eq!(stats.analyzed_count, 1);
    assert_eq!(stats.recent_count, 1);
    let avg = stats.avg_credibility.expect("average present");
    assert!((avg - result.credibility.score).abs() < 1e-9);
}

#[tokio::test]
async fn archive_moves_nothing_when_history_is_fresh() {
    let record = supplier("Fresh History");
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;
    service
        .analyze_supplier(record.id, None)
        .await
        .expect("analysis");

    let report = service.archive_history(365).await.expect("archive");
    assert_eq!(report.archived, 0);
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn retired_supplier_keeps_history_but_refuses_analysis() {
    let record = supplier("Sunset Vendor");
    let service = service_with(vec![record.clone()], ServiceConfig::default()).await;
    service
        .analyze_supplier(record.id, None)
        .await
        .expect("analysis before retirement");

    service
        .retire_supplier(record.id)
        .await
        .expect("retire succeeds");
    let err = service
        .analyze_supplier(record.id, None)
        .await
        .expect_err("retired supplier");
    assert!(matches!(err, ServiceError::Store(StoreError::NotFound(id)) if id == record.id));

    let history = service.get_history(record.id).await.expect("history");
    assert_eq!(history.entries.len(), 1);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn service_config_defaults() {
    let config = ServiceConfig::default();
    assert_eq!(config.batch_chunk_size, 5);
    assert_eq!(config.batch_pause, Duration::from_millis(500));
}
