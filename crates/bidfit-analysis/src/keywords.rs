//! Keyword tables used for capability extraction and domain inference.
//!
//! Matching is case-insensitive and anchored on word boundaries, so `aws`
//! matches "AWS-hosted" but not "laws".

use std::sync::LazyLock;

use bidfit_core::Domain;
use regex::Regex;

/// Description phrases and the capability each one implies.
pub(crate) const DESCRIPTION_KEYWORDS: &[(&str, &str)] = &[
    ("aws", "AWS cloud services"),
    ("amazon web services", "AWS cloud services"),
    ("azure", "Microsoft Azure"),
    ("google cloud", "Google Cloud Platform"),
    ("gcp", "Google Cloud Platform"),
    ("kubernetes", "Container orchestration"),
    ("docker", "Containerization"),
    ("machine learning", "Machine learning solutions"),
    ("artificial intelligence", "AI solutions"),
    ("ai", "AI solutions"),
    ("analytics", "Data analytics"),
    ("cybersecurity", "Cybersecurity"),
    ("devops", "DevOps"),
    ("mobile", "Mobile development"),
    ("web development", "Web development"),
    ("hipaa", "Healthcare compliance"),
    ("ehr", "Electronic health records"),
    ("emr", "Electronic health records"),
    ("erp", "ERP implementation"),
    ("blockchain", "Blockchain development"),
    ("supply chain", "Supply chain management"),
    ("ecommerce", "E-commerce platforms"),
    ("e-commerce", "E-commerce platforms"),
    ("data migration", "Data migration"),
    ("consulting", "Technology consulting"),
];

/// Service-list phrases and the capability each one implies.
pub(crate) const SERVICE_KEYWORDS: &[(&str, &str)] = &[
    ("cloud migration", "Cloud migration"),
    ("managed services", "Managed IT services"),
    ("software development", "Custom software development"),
    ("custom software", "Custom software development"),
    ("integration", "Systems integration"),
    ("design", "UX/UI design"),
    ("testing", "Quality assurance"),
    ("qa", "Quality assurance"),
    ("support", "Technical support"),
    ("training", "Training services"),
    ("project management", "Project management"),
    ("data engineering", "Data engineering"),
    ("api", "API development"),
    ("maintenance", "Maintenance and support"),
    ("staffing", "Staff augmentation"),
    ("audit", "Compliance auditing"),
];

/// Certification names and the capability each one implies.
pub(crate) const CERTIFICATION_KEYWORDS: &[(&str, &str)] = &[
    ("iso 27001", "Information security management"),
    ("iso 9001", "Quality management"),
    ("soc 2", "SOC 2 compliance"),
    ("soc2", "SOC 2 compliance"),
    ("hipaa", "Healthcare compliance"),
    ("hitrust", "Healthcare compliance"),
    ("pci", "Payment card security"),
    ("fedramp", "Federal cloud compliance"),
    ("cmmi", "Process maturity"),
    ("aws certified", "AWS cloud services"),
    ("azure", "Microsoft Azure"),
    ("pmp", "Project management"),
    ("gdpr", "Data privacy compliance"),
    ("cissp", "Cybersecurity"),
    ("mbe", "Diversity-certified supplier"),
    ("wbe", "Diversity-certified supplier"),
];

const HEALTHCARE: &[&str] = &[
    "healthcare", "health", "medical", "hospital", "hospitals", "clinical", "clinic",
    "patient", "patients", "hipaa", "hitrust", "pharma", "pharmaceutical", "ehr", "telehealth",
];
const FINANCE: &[&str] = &[
    "finance", "financial", "banking", "bank", "banks", "fintech", "payment", "payments",
    "insurance", "accounting", "investment", "pci",
];
const EDUCATION: &[&str] = &[
    "education", "school", "schools", "university", "universities", "learning", "edtech",
    "student", "students", "curriculum", "ferpa",
];
const RETAIL: &[&str] = &[
    "retail", "ecommerce", "e-commerce", "store", "stores", "merchandising", "shopping",
    "point of sale", "consumer",
];
const MANUFACTURING: &[&str] = &[
    "manufacturing", "factory", "industrial", "production", "assembly", "machining",
    "fabrication", "iso 9001",
];
const REAL_ESTATE: &[&str] = &[
    "real estate", "property", "properties", "leasing", "mortgage", "construction",
    "facilities",
];
const LOGISTICS: &[&str] = &[
    "logistics", "shipping", "freight", "warehouse", "warehousing", "supply chain", "fleet",
    "transportation",
];
const ENERGY: &[&str] = &[
    "energy", "solar", "utility", "utilities", "oil", "renewable", "renewables", "power grid",
    "wind",
];

#[must_use]
pub fn domain_keywords(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Healthcare => HEALTHCARE,
        Domain::Finance => FINANCE,
        Domain::Education => EDUCATION,
        Domain::Retail => RETAIL,
        Domain::Manufacturing => MANUFACTURING,
        Domain::RealEstate => REAL_ESTATE,
        Domain::Logistics => LOGISTICS,
        Domain::Energy => ENERGY,
        Domain::Technology => &[],
    }
}

/// A compiled keyword and the capability it maps to.
pub(crate) struct KeywordRule {
    pattern: Regex,
    pub(crate) capability: &'static str,
}

impl KeywordRule {
    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn word_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).expect("valid keyword regex")
}

fn compile(table: &[(&'static str, &'static str)]) -> Vec<KeywordRule> {
    table
        .iter()
        .map(|&(keyword, capability)| KeywordRule {
            pattern: word_pattern(keyword),
            capability,
        })
        .collect()
}

pub(crate) static DESCRIPTION_RULES: LazyLock<Vec<KeywordRule>> =
    LazyLock::new(|| compile(DESCRIPTION_KEYWORDS));
pub(crate) static SERVICE_RULES: LazyLock<Vec<KeywordRule>> =
    LazyLock::new(|| compile(SERVICE_KEYWORDS));
pub(crate) static CERTIFICATION_RULES: LazyLock<Vec<KeywordRule>> =
    LazyLock::new(|| compile(CERTIFICATION_KEYWORDS));

static DOMAIN_PATTERNS: LazyLock<Vec<(Domain, Vec<Regex>)>> = LazyLock::new(|| {
    Domain::SCORED
        .iter()
        .map(|&domain| {
            let patterns = domain_keywords(domain)
                .iter()
                .map(|k| word_pattern(k))
                .collect();
            (domain, patterns)
        })
        .collect()
});

/// Number of distinct `domain` keywords present in `text`.
#[must_use]
pub fn domain_keyword_hits(domain: Domain, text: &str) -> usize {
    DOMAIN_PATTERNS
        .iter()
        .find(|(d, _)| *d == domain)
        .map_or(0, |(_, patterns)| {
            patterns.iter().filter(|p| p.is_match(text)).count()
        })
}
