//! Actions an agent may submit, and the outcome the engine reports back.
//!
//! The engine never raises an error for an action whose precondition fails:
//! it leaves all state untouched and reports `Outcome::Ignored` with the
//! `Rejection` that explains why. Callers that only care about state can
//! ignore the outcome entirely.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    audit::AuditEntry,
    error::CarechainError,
    record::{ConfidentialityState, Payload},
    role::AgentRole,
};

/// A request issued by one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Create a record in the owner's empty slot. `None` uses intake defaults.
    Admit { payload: Option<Payload> },
    /// Replace the payload of a plaintext record with one of the same shape.
    Amend { payload: Payload },
    /// Lock a plaintext record.
    Lock,
    /// Unlock a sealed record in the owner's slot.
    Unlock,
    /// Move the held record to `target`.
    Forward { target: AgentRole },
    /// Run the role's configured computation on the held record.
    Compute,
}

impl Action {
    /// Short lowercase name used in logs and rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Admit { .. } => "admit",
            Action::Amend { .. } => "amend",
            Action::Lock => "lock",
            Action::Unlock => "unlock",
            Action::Forward { .. } => "forward",
            Action::Compute => "compute",
        }
    }

    /// Build an action from the loose string surface a UI or CLI submits.
    ///
    /// Accepts the canonical names plus the legacy console verbs
    /// (`create_data`, `encrypt`, `decrypt`, `delegate`, `inference`).
    pub fn from_parts(
        name: &str,
        payload: Option<Payload>,
        target: Option<AgentRole>,
    ) -> Result<Self, CarechainError> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let action = match normalized.as_str() {
            "admit" | "create_data" => Action::Admit { payload },
            "amend" | "update" => Action::Amend {
                payload: payload.ok_or_else(|| CarechainError::MalformedRequest {
                    reason: "amend requires a payload".to_string(),
                })?,
            },
            "lock" | "encrypt" => Action::Lock,
            "unlock" | "decrypt" => Action::Unlock,
            "forward" | "delegate" => Action::Forward {
                target: target.ok_or_else(|| CarechainError::MalformedRequest {
                    reason: "forward requires a target role".to_string(),
                })?,
            },
            "compute" | "inference" => Action::Compute,
            _ => {
                return Err(CarechainError::MalformedRequest {
                    reason: format!("unknown action '{}'", name),
                })
            }
        };
        Ok(action)
    }
}

impl FromStr for Action {
    type Err = CarechainError;

    /// Parse a payload-free action. `forward:<role>` carries the target.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, target)) => Action::from_parts(name, None, Some(target.parse()?)),
            None => Action::from_parts(s, None, None),
        }
    }
}

/// Why the engine ignored an action. Purely informational: an ignored action
/// changes nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("{role} is not permitted to {action}")]
    NotPermitted { role: AgentRole, action: &'static str },

    #[error("{role} may not forward to {target}")]
    TargetNotAllowed { role: AgentRole, target: AgentRole },

    #[error("{role} slot holds no record")]
    EmptySlot { role: AgentRole },

    #[error("{role} slot already holds a record")]
    SlotOccupied { role: AgentRole },

    #[error("record is {state}, which does not permit {action}")]
    WrongState { state: ConfidentialityState, action: &'static str },

    #[error("{role} slot is mid-transition")]
    Busy { role: AgentRole },

    #[error("{agent} has already contributed to this record")]
    AlreadyContributed { agent: String },

    #[error("record has already been settled")]
    AlreadySettled,

    #[error("{milestone} is already on the record")]
    AlreadyPerformed { milestone: String },

    #[error("payload shape does not match the record")]
    PayloadShape,

    #[error("provider failed: {reason}")]
    Provider { reason: String },

    #[error("workflow was reset while the transition was in flight")]
    Superseded,

    #[error("unrecognized request: {reason}")]
    Unrecognized { reason: String },
}

/// What happened to a submitted action.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The action committed. `entries` are the audit entries it appended,
    /// in order.
    Applied { entries: Vec<AuditEntry> },
    /// The action was a no-op.
    Ignored(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    /// The rejection, if the action was ignored.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Ignored(r) => Some(r),
            Outcome::Applied { .. } => None,
        }
    }

    /// Audit entries appended by this action; empty when ignored.
    pub fn entries(&self) -> &[AuditEntry] {
        match self {
            Outcome::Applied { entries } => entries,
            Outcome::Ignored(_) => &[],
        }
    }
}
