//! The clinical record: the unit of work flowing between agent slots.
//!
//! A `Record` is created once by the data owner, carried from slot to slot
//! by the transition engine, and annotated along the way. The engine is the
//! only component that replaces a record inside a slot; everything here is
//! plain data plus the small helpers the engine needs to keep the record's
//! invariants (forward-only state, append-only provenance, one charge per
//! agent).

use serde::{Deserialize, Serialize};

/// Unique identifier for a single record, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub uuid::Uuid);

impl RecordId {
    /// Create a new, unique record ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Patient vitals as recorded at admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientVitals {
    /// Beats per minute.
    pub heart_rate: f64,
    /// mmHg.
    pub systolic: f64,
    /// mmHg.
    pub diastolic: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percent.
    pub oxygen_sat: f64,
    /// 0–100.
    pub symptom_severity: f64,
}

impl Default for PatientVitals {
    /// The intake vitals a fresh admission starts with.
    fn default() -> Self {
        Self {
            heart_rate: 72.0,
            systolic: 120.0,
            diastolic: 80.0,
            temperature: 36.6,
            oxygen_sat: 98.0,
            symptom_severity: 20.0,
        }
    }
}

/// The domain value carried by a record.
///
/// Exactly one shape is active per record and the shape never changes after
/// creation; only field values do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Payload {
    Vitals(PatientVitals),
    Scalar(f64),
}

impl Payload {
    /// True when `other` has the same variant as `self`.
    pub fn same_shape(&self, other: &Payload) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// The vitals, if this payload carries them.
    pub fn vitals(&self) -> Option<&PatientVitals> {
        match self {
            Payload::Vitals(v) => Some(v),
            Payload::Scalar(_) => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Vitals(PatientVitals::default())
    }
}

/// Confidentiality state of a record.
///
/// The derived ordering is the legal progression: a record only ever moves
/// to a state that compares greater than or equal to its current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidentialityState {
    /// Editable; only meaningful in the owner's slot.
    Plaintext,
    /// Locked, in transit or at rest in the agent chain.
    Confidential,
    /// Has undergone at least one computation step while still locked.
    Annotated,
    /// Deliberately unlocked by the owner. Terminal.
    Revealed,
}

impl ConfidentialityState {
    /// True for the two states in which a record may travel the chain.
    pub fn is_sealed(self) -> bool {
        matches!(self, ConfidentialityState::Confidential | ConfidentialityState::Annotated)
    }
}

impl std::fmt::Display for ConfidentialityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidentialityState::Plaintext => "PLAINTEXT",
            ConfidentialityState::Confidential => "CONFIDENTIAL",
            ConfidentialityState::Annotated => "ANNOTATED",
            ConfidentialityState::Revealed => "REVEALED",
        };
        f.write_str(s)
    }
}

/// One agent's contribution to the bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeLine {
    /// Display name of the contributing agent.
    pub agent: String,
    pub amount: f64,
}

/// Insertion-ordered charge ledger, at most one line per agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Charges {
    lines: Vec<ChargeLine>,
}

impl Charges {
    /// Record `amount` for `agent`.
    ///
    /// Returns `false` and leaves the ledger untouched when the agent has
    /// already contributed.
    pub fn insert(&mut self, agent: impl Into<String>, amount: f64) -> bool {
        let agent = agent.into();
        if self.contains(&agent) {
            return false;
        }
        self.lines.push(ChargeLine { agent, amount });
        true
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.lines.iter().any(|l| l.agent == agent)
    }

    pub fn get(&self, agent: &str) -> Option<f64> {
        self.lines.iter().find(|l| l.agent == agent).map(|l| l.amount)
    }

    /// Sum of every line in insertion order. Zero for an empty ledger.
    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChargeLine> {
        self.lines.iter()
    }
}

/// The clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub payload: Payload,
    pub state: ConfidentialityState,
    /// Opaque fingerprint produced by the lock transform.
    pub sealed: Option<String>,
    /// Ordered milestones. Never shrinks.
    pub provenance: Vec<String>,
    pub charges: Charges,
    /// Set once, by the settling step, to `charges.total()`.
    pub total_charge: Option<f64>,
    /// Written by diagnostic steps; later steps overwrite it.
    pub severity: Option<f64>,
}

impl Record {
    /// Create a fresh plaintext record whose provenance is `["created"]`.
    pub fn admit(payload: Payload) -> Self {
        Self {
            id: RecordId::new(),
            payload,
            state: ConfidentialityState::Plaintext,
            sealed: None,
            provenance: vec!["created".to_string()],
            charges: Charges::default(),
            total_charge: None,
            severity: None,
        }
    }

    /// Append a provenance milestone.
    pub fn note(&mut self, milestone: impl Into<String>) {
        self.provenance.push(milestone.into());
    }

    /// Move to `next` if that is not a step backwards.
    ///
    /// Returns `false` and leaves the state untouched on a backward move.
    pub fn advance(&mut self, next: ConfidentialityState) -> bool {
        if next < self.state {
            return false;
        }
        self.state = next;
        true
    }

    /// True once the billing step has computed `total_charge`.
    pub fn is_settled(&self) -> bool {
        self.total_charge.is_some()
    }
}
