//! Data exchanged with the two external collaborators.
//!
//! The computation provider turns a record into a transformed record plus a
//! human-readable account of what it did. The advisory provider produces a
//! charge and narrative for one agent's step. The engine does not care how
//! either computes its numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    audit::Metrics,
    record::{Payload, Record},
    role::AgentRole,
};

/// Result of one computation-provider transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    /// The transformed record. The provider must not change its id or
    /// payload shape.
    pub record: Record,
    /// One-line description, used as the audit entry's details.
    pub description: String,
    pub formula: Option<String>,
    /// Ordered steps documenting how a computed value was reached.
    pub derivation: Vec<String>,
    pub metrics: Metrics,
}

/// Input to an advisory call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub role: AgentRole,
    /// The clinical inputs, i.e. the record's payload.
    pub inputs: Payload,
    /// The severity the record carried before this step, if any.
    pub prior_severity: Option<f64>,
}

/// An advisory provider's answer. Always present; failures resolve to a
/// per-role fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    /// Monetary amount charged for this step.
    pub amount: f64,
    pub narrative: String,
    /// Severity annotation, for diagnostic roles.
    pub annotation: Option<f64>,
    /// Extra named findings (e.g. lab biomarkers).
    #[serde(default)]
    pub findings: BTreeMap<String, f64>,
}

impl Advice {
    pub fn new(amount: f64, narrative: impl Into<String>) -> Self {
        Self {
            amount,
            narrative: narrative.into(),
            annotation: None,
            findings: BTreeMap::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: Option<f64>) -> Self {
        self.annotation = annotation;
        self
    }
}
