//! Audit entry types.
//!
//! The engine describes each completed transition as an `AuditDraft`; the
//! audit sink seals the draft into an `AuditEntry` by assigning its id,
//! sequence number, timestamp, and integrity tag. Entries are never modified
//! after they are sealed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::AgentRole;

/// A single metric value: numeric or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{n}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// Label → value, ordered by label so serialized entries hash stably.
pub type Metrics = BTreeMap<String, MetricValue>;

/// The engine's description of one transition step, before sealing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub source: AgentRole,
    /// Action name, e.g. "ADMIT", "DIAGNOSIS", "FORWARD_BILLING".
    pub action: String,
    pub details: String,
    pub metrics: Option<Metrics>,
    pub formula: Option<String>,
    pub derivation: Option<Vec<String>>,
}

impl AuditDraft {
    /// A draft with only the required fields set.
    pub fn new(source: AgentRole, action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            source,
            action: action.into(),
            details: details.into(),
            metrics: None,
            formula: None,
            derivation: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        if !metrics.is_empty() {
            self.metrics = Some(metrics);
        }
        self
    }

    pub fn with_formula(mut self, formula: Option<String>) -> Self {
        self.formula = formula;
        self
    }

    pub fn with_derivation(mut self, steps: Vec<String>) -> Self {
        if !steps.is_empty() {
            self.derivation = Some(steps);
        }
        self
    }
}

/// An immutable, sealed record of one completed transition step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub source: AgentRole,
    pub action: String,
    pub details: String,
    pub metrics: Option<Metrics>,
    pub formula: Option<String>,
    pub derivation: Option<Vec<String>>,
    /// Integrity tag of the preceding entry, or the genesis tag.
    pub prev_tag: String,
    /// Fingerprint of this entry, unique within a run.
    pub integrity_tag: String,
}
