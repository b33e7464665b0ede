//! Bounded in-memory audit trail of repository calls.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub operation: String,
    pub subject: Option<Uuid>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(operation: impl Into<String>, subject: Option<Uuid>, success: bool) -> Self {
        Self {
            operation: operation.into(),
            subject,
            success,
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Ring buffer that evicts the oldest entry once full.
#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All retained entries, oldest first.
    pub async fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }
}
