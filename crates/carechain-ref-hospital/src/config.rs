//! Hospital configuration: facility manifest, routing table, and the
//! advisory fallback table.
//!
//! Both TOML files are embedded at build time so the reference hospital runs
//! without any files on disk; `from_file` variants exist for operators who
//! want to swap them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use carechain_contracts::{
    error::{CarechainError, CarechainResult},
    facility::FacilityManifest,
    role::AgentRole,
};
use carechain_policy::TomlRoutingPolicy;

/// The hospital's routing table.
pub const HOSPITAL_ROUTING: &str = include_str!("../policies/routing.toml");

/// The hospital's facility manifest and fallback table.
pub const HOSPITAL_CONFIG: &str = include_str!("../config/hospital.toml");

/// The fixed answer an advisor gives a role when it has nothing better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackAdvice {
    pub role: AgentRole,
    pub amount: f64,
    pub narrative: String,
    /// Severity to report when there is no prior severity to carry.
    pub annotation: Option<f64>,
    /// Report the record's prior severity instead of `annotation` when present.
    #[serde(default)]
    pub carry_prior_severity: bool,
    #[serde(default)]
    pub findings: BTreeMap<String, f64>,
}

/// Everything in `config/hospital.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalConfig {
    pub facility: FacilityManifest,
    #[serde(default)]
    pub fallbacks: Vec<FallbackAdvice>,
}

impl HospitalConfig {
    /// Parse `s` as a hospital configuration.
    pub fn from_toml_str(s: &str) -> CarechainResult<Self> {
        let config: HospitalConfig = toml::from_str(s).map_err(|e| CarechainError::ConfigError {
            reason: format!("failed to parse hospital TOML: {}", e),
        })?;

        let mut roles: Vec<AgentRole> = config.fallbacks.iter().map(|f| f.role).collect();
        roles.sort();
        roles.dedup();
        if roles.len() != config.fallbacks.len() {
            return Err(CarechainError::ConfigError {
                reason: "hospital TOML lists a fallback role more than once".to_string(),
            });
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CarechainResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CarechainError::ConfigError {
            reason: format!("failed to read hospital file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded St. Zama Memorial configuration.
    pub fn embedded() -> CarechainResult<Self> {
        Self::from_toml_str(HOSPITAL_CONFIG)
    }

    pub fn fallback(&self, role: AgentRole) -> Option<&FallbackAdvice> {
        self.fallbacks.iter().find(|f| f.role == role)
    }
}

/// The embedded routing table, validated.
pub fn hospital_routing() -> CarechainResult<TomlRoutingPolicy> {
    TomlRoutingPolicy::from_toml_str(HOSPITAL_ROUTING)
}
