//! Snapshot types produced by one analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bumped whenever the serialized shape of [`AnalysisResult`] changes.
pub const ANALYSIS_SCHEMA_VERSION: u32 = 2;

/// Lower and upper bound of every credibility score.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Healthcare,
    Finance,
    Education,
    Retail,
    Manufacturing,
    #[serde(rename = "Real Estate")]
    RealEstate,
    Logistics,
    Energy,
    Technology,
}

impl Domain {
    /// Industry domains in declaration order. `Technology` is the fallback and
    /// is never scored directly.
    pub const SCORED: [Domain; 8] = [
        Domain::Healthcare,
        Domain::Finance,
        Domain::Education,
        Domain::Retail,
        Domain::Manufacturing,
        Domain::RealEstate,
        Domain::Logistics,
        Domain::Energy,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Domain::Healthcare => "Healthcare",
            Domain::Finance => "Finance",
            Domain::Education => "Education",
            Domain::Retail => "Retail",
            Domain::Manufacturing => "Manufacturing",
            Domain::RealEstate => "Real Estate",
            Domain::Logistics => "Logistics",
            Domain::Energy => "Energy",
            Domain::Technology => "Technology",
        }
    }

    #[must_use]
    pub fn is_specialized(self) -> bool {
        self != Domain::Technology
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability set derived by the extractor.
///
/// `enhanced` always contains every entry of `original`, has no duplicates
/// (case-insensitive), and no entry shorter than three characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityAnalysis {
    pub original: Vec<String>,
    pub enhanced: Vec<String>,
    pub domain: Domain,
    pub specializations: Vec<String>,
    pub enhancement_ratio: f64,
}

/// A ceiling applied after the components are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCap {
    pub ceiling: f64,
    pub reason: String,
}

/// Per-component credibility scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityBreakdown {
    pub experience: f64,
    pub project_portfolio: f64,
    pub certifications: f64,
    pub team_size: f64,
    pub testimonials: f64,
    pub financial_stability: f64,
    pub domain_expertise: f64,
    pub quality_cap: Option<QualityCap>,
    pub total: f64,
}

impl CredibilityBreakdown {
    #[must_use]
    pub fn component_sum(&self) -> f64 {
        self.experience
            + self.project_portfolio
            + self.certifications
            + self.team_size
            + self.testimonials
            + self.financial_stability
            + self.domain_expertise
    }

    /// Total derived from the components: sum, apply the quality cap, clamp.
    #[must_use]
    pub fn recompute_total(&self) -> f64 {
        let sum = self.component_sum();
        let capped = match &self.quality_cap {
            Some(cap) => sum.min(cap.ceiling),
            None => sum,
        };
        capped.clamp(SCORE_MIN, SCORE_MAX)
    }
}

/// Credibility section of an analysis.
///
/// `breakdown` is `None` only when scoring fell back to a safe default, in
/// which case `fallback_reason` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityReport {
    pub score: f64,
    pub breakdown: Option<CredibilityBreakdown>,
    pub factors: Vec<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    EstablishedLeader,
    GrowingPlayer,
    MidMarket,
    Emerging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPosition {
    pub category: MarketCategory,
    /// 1 is the strongest tier.
    pub rank: u32,
    /// One of `dominant`, `significant`, `moderate`, `minimal`.
    pub market_share: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// In `[0.5, 1.0]`.
    pub score: f64,
    pub level: QualityLevel,
    pub missing_sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Success,
    PartialSuccess,
}

/// Immutable snapshot of one analysis run.
///
/// Later runs supersede a snapshot; they never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub schema_version: u32,
    pub analyzed_at: DateTime<Utc>,
    pub status: AnalysisStatus,
    pub errors: Vec<String>,
    pub confidence: f64,
    pub capabilities: CapabilityAnalysis,
    pub credibility: CredibilityReport,
    pub market_position: MarketPosition,
    pub competitive_advantages: Vec<String>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_sources: Vec<String>,
    pub data_quality: DataQuality,
}

impl AnalysisResult {
    /// `true` when every stage completed without falling back.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}
