use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier as stored in the `suppliers` table.
///
/// Declared attributes come from the supplier's own profile. The
/// `credibility_score`, `confidence`, `data_sources` and `last_analyzed_at`
/// fields are denormalized from the most recent analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    pub team_size: Option<u32>,
    pub years_experience: Option<f64>,
    pub project_count: Option<u32>,
    pub location: Option<String>,
    pub credibility_score: Option<f64>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub data_sources: Vec<String>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl SupplierRecord {
    /// A bare record with only an identity and a name.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            capabilities: Vec::new(),
            industries: Vec::new(),
            team_size: None,
            years_experience: None,
            project_count: None,
            location: None,
            credibility_score: None,
            confidence: None,
            data_sources: Vec::new(),
            last_analyzed_at: None,
            archived_at: None,
        }
    }

    /// The trimmed name, or `None` when the name is missing or blank.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// A published case study attached to an enrichment payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Caller-supplied data used to augment a stored supplier for one analysis.
///
/// Every field is optional. Absent values fall back to:
///
/// | Field                 | Default                                 |
/// |-----------------------|-----------------------------------------|
/// | `description`         | no description                          |
/// | `services`            | empty                                   |
/// | `certifications`      | empty                                   |
/// | `testimonial_count`   | 0                                       |
/// | `case_studies`        | empty                                   |
/// | `team_size`           | the stored record's `team_size`         |
/// | `financial_stability` | no rating, no bonus                     |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentPayload {
    pub description: Option<String>,
    pub services: Vec<String>,
    pub certifications: Vec<String>,
    pub testimonial_count: Option<u32>,
    pub case_studies: Vec<CaseStudy>,
    pub team_size: Option<u32>,
    pub financial_stability: Option<String>,
}

impl EnrichmentPayload {
    /// The trimmed description, or `""` when absent.
    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.as_deref().map_or("", str::trim)
    }

    /// Character count of the trimmed description.
    #[must_use]
    pub fn description_len(&self) -> usize {
        self.description_text().chars().count()
    }

    #[must_use]
    pub fn testimonials(&self) -> u32 {
        self.testimonial_count.unwrap_or(0)
    }

    /// Services with blank entries removed.
    pub fn non_blank_services(&self) -> impl Iterator<Item = &str> {
        self.services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Certifications with blank entries removed.
    pub fn non_blank_certifications(&self) -> impl Iterator<Item = &str> {
        self.certifications
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// `true` when none of the text or list sources carry anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description_len() == 0
            && self.non_blank_services().next().is_none()
            && self.non_blank_certifications().next().is_none()
            && self.testimonials() == 0
            && self.case_studies.is_empty()
    }
}
