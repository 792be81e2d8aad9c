//! Agent role identity.
//!
//! The workflow has a fixed cast of six roles. Routing tables, audit entries,
//! and charge ledgers all refer to agents through this enum; the display name
//! (e.g. "General Doctor") is what appears in charge ledgers and logs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CarechainError;

/// One named role in the workflow chain.
///
/// Serialized in kebab-case (`"general-doctor"`) so routing tables read
/// naturally in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Patient,
    GeneralDoctor,
    Specialist,
    MedicalLab,
    Billing,
    HumanDoctor,
}

impl AgentRole {
    /// Every role, in the order slots are presented.
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Patient,
        AgentRole::GeneralDoctor,
        AgentRole::Specialist,
        AgentRole::MedicalLab,
        AgentRole::Billing,
        AgentRole::HumanDoctor,
    ];

    /// Human-readable name used as the key in a record's charge ledger.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Patient => "Patient",
            AgentRole::GeneralDoctor => "General Doctor",
            AgentRole::Specialist => "Specialist",
            AgentRole::MedicalLab => "Medical Lab",
            AgentRole::Billing => "Billing",
            AgentRole::HumanDoctor => "Human Doctor",
        }
    }

    /// Stable kebab-case identifier, matching the serde representation.
    pub fn slug(self) -> &'static str {
        match self {
            AgentRole::Patient => "patient",
            AgentRole::GeneralDoctor => "general-doctor",
            AgentRole::Specialist => "specialist",
            AgentRole::MedicalLab => "medical-lab",
            AgentRole::Billing => "billing",
            AgentRole::HumanDoctor => "human-doctor",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AgentRole {
    type Err = CarechainError;

    /// Accepts the slug, the display name, or the SCREAMING_SNAKE form,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c.to_ascii_lowercase() })
            .collect();

        AgentRole::ALL
            .into_iter()
            .find(|role| role.slug() == normalized)
            .ok_or_else(|| CarechainError::UnknownRole { name: s.to_string() })
    }
}
