//! Assembles a complete [`AnalysisResult`] from the extractor, the scorer and
//! the insight derivations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use bidfit_core::{
    AnalysisResult, AnalysisStatus, EnrichmentPayload, ScoringThresholds, SupplierRecord,
    ANALYSIS_SCHEMA_VERSION,
};

use crate::extractor::extract;
use crate::insights::{
    competitive_advantages, confidence, data_quality, data_sources, effective_team_size,
    effective_years, insights, market_position, recommendations,
};
use crate::scorer::{score, CredibilityOutcome};

/// Error recorded on results for suppliers without a usable name.
pub const MISSING_NAME_ERROR: &str = "supplier name is missing or blank";

/// Stateless analysis runner bound to one set of scoring thresholds.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    thresholds: ScoringThresholds,
}

impl Analyzer {
    #[must_use]
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Analyze a supplier, stamping the result with the current time.
    #[must_use]
    pub fn analyze(
        &self,
        supplier: &SupplierRecord,
        enrichment: Option<&EnrichmentPayload>,
    ) -> AnalysisResult {
        self.analyze_at(supplier, enrichment, Utc::now())
    }

    /// Analyze a supplier as of `now`.
    ///
    /// Never fails. A scorer fallback or a missing supplier name yields
    /// [`AnalysisStatus::PartialSuccess`] with the causes in `errors`.
    #[must_use]
    pub fn analyze_at(
        &self,
        supplier: &SupplierRecord,
        enrichment: Option<&EnrichmentPayload>,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let enrichment = enrichment.filter(|e| !e.is_empty());

        let capabilities = extract(supplier, enrichment, &self.thresholds);
        let outcome = score(supplier, enrichment, &self.thresholds);

        let mut errors = Vec::new();
        let supplier_name = match supplier.display_name() {
            Some(name) => name.to_string(),
            None => {
                errors.push(MISSING_NAME_ERROR.to_string());
                String::new()
            }
        };
        if let CredibilityOutcome::SafeDefault { reason, .. } = &outcome {
            errors.push(format!("credibility scoring fell back to safe default: {reason}"));
        }
        let partial = !errors.is_empty();

        let credibility = outcome.into_report();
        let team_size = effective_team_size(supplier, enrichment);
        let years = effective_years(supplier);
        let certifications = enrichment.map_or(0, |e| {
            e.non_blank_certifications()
                .map(str::to_lowercase)
                .collect::<HashSet<_>>()
                .len()
        });

        AnalysisResult {
            id: Uuid::new_v4(),
            supplier_id: supplier.id,
            supplier_name,
            schema_version: ANALYSIS_SCHEMA_VERSION,
            analyzed_at: now,
            status: if partial {
                AnalysisStatus::PartialSuccess
            } else {
                AnalysisStatus::Success
            },
            errors,
            confidence: confidence(enrichment, credibility.score),
            market_position: market_position(team_size, years),
            competitive_advantages: competitive_advantages(
                &capabilities,
                team_size,
                years,
                certifications,
            ),
            insights: insights(&capabilities, credibility.score, years),
            recommendations: recommendations(&capabilities, enrichment, partial),
            data_sources: data_sources(enrichment),
            data_quality: data_quality(enrichment),
            capabilities,
            credibility,
        }
    }
}

/// Analyze with the default scoring thresholds.
#[must_use]
pub fn analyze(supplier: &SupplierRecord, enrichment: Option<&EnrichmentPayload>) -> AnalysisResult {
    Analyzer::default().analyze(supplier, enrichment)
}
