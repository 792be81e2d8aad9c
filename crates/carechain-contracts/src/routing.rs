//! Routing table types: which actions each role may take, and where a role
//! may send a record.
//!
//! The routing table is configuration, not logic. The transition engine
//! consults it for every request and never branches on a specific role, so
//! re-wiring the chain or adding a role only touches the table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    action::{Action, Rejection},
    error::{CarechainError, CarechainResult},
    role::AgentRole,
};

/// An automatic forward that runs after a compute step commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRoute {
    pub target: AgentRole,
    /// Audit action name, e.g. "FORWARD_BILLING".
    pub action: String,
    pub details: String,
    /// Status shown in the target slot once the record arrives.
    #[serde(default = "default_received")]
    pub target_status: String,
}

/// The computation a role performs on its held record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRoute {
    /// Operation name passed to the computation provider.
    pub operation: String,
    /// Audit action name, e.g. "DIAGNOSIS".
    pub action: String,
    /// Consult the advisory provider before computing.
    #[serde(default)]
    pub advise: bool,
    /// Compute `total_charge` from the charge ledger.
    #[serde(default)]
    pub settle: bool,
    /// Status while the step is in flight.
    pub busy_status: String,
    /// Status once the step commits.
    pub done_status: String,
    /// Automatic forward after the step commits.
    pub then: Option<ChainRoute>,
}

/// Everything one role is allowed to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRoute {
    pub role: AgentRole,
    /// The data owner may admit, amend, lock, and unlock.
    #[serde(default)]
    pub owner: bool,
    /// Roles this role may forward to.
    #[serde(default)]
    pub forward_targets: Vec<AgentRole>,
    /// Audit action name for a forward, e.g. "REFERRAL".
    #[serde(default = "default_forward_action")]
    pub forward_action: String,
    /// Consult the advisory provider and record a charge before forwarding.
    #[serde(default)]
    pub advise_on_forward: bool,
    /// Status while a forward is in flight.
    #[serde(default = "default_forwarding")]
    pub forwarding_status: String,
    /// Status left in this slot once the record has gone.
    #[serde(default = "default_forwarded")]
    pub forwarded_status: String,
    pub compute: Option<ComputeRoute>,
}

impl RoleRoute {
    pub fn may_forward_to(&self, target: AgentRole) -> bool {
        self.forward_targets.contains(&target)
    }

    /// Whether this route lets its role attempt `action` at all.
    ///
    /// Slot contents and record state are not considered here.
    pub fn permits(&self, action: &Action) -> Result<(), Rejection> {
        let allowed = match action {
            Action::Admit { .. } | Action::Amend { .. } | Action::Lock | Action::Unlock => self.owner,
            Action::Forward { target } => {
                if !self.may_forward_to(*target) {
                    return Err(Rejection::TargetNotAllowed {
                        role: self.role,
                        target: *target,
                    });
                }
                true
            }
            Action::Compute => self.compute.is_some(),
        };
        if allowed {
            Ok(())
        } else {
            Err(Rejection::NotPermitted {
                role: self.role,
                action: action.name(),
            })
        }
    }
}

/// The full table. Roles without an entry may do nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub routes: Vec<RoleRoute>,
}

impl RoutingTable {
    /// The route for `role`, if it has one.
    pub fn route(&self, role: AgentRole) -> Option<&RoleRoute> {
        self.routes.iter().find(|r| r.role == role)
    }

    /// The data-owner role, if the table declares one.
    pub fn owner(&self) -> Option<AgentRole> {
        self.routes.iter().find(|r| r.owner).map(|r| r.role)
    }

    /// Check the table's well-formedness rules, returning the first violation.
    ///
    /// Rules:
    /// - exactly one route is marked `owner`
    /// - no role has more than one route
    /// - no role lists itself as a forward target
    /// - no compute step chains back into its own slot
    pub fn validate(&self) -> CarechainResult<()> {
        let owners = self.routes.iter().filter(|r| r.owner).count();
        if owners != 1 {
            return Err(config_error(format!(
                "routing table must mark exactly one owner role, found {owners}"
            )));
        }

        let mut seen = BTreeSet::new();
        for route in &self.routes {
            if !seen.insert(route.role) {
                return Err(config_error(format!(
                    "role '{}' has more than one route",
                    route.role.slug()
                )));
            }

            if route.may_forward_to(route.role) {
                return Err(config_error(format!(
                    "role '{}' lists itself as a forward target",
                    route.role.slug()
                )));
            }

            let chains_to_self = route
                .compute
                .as_ref()
                .and_then(|c| c.then.as_ref())
                .is_some_and(|then| then.target == route.role);
            if chains_to_self {
                return Err(config_error(format!(
                    "compute step of role '{}' chains back into its own slot",
                    route.role.slug()
                )));
            }
        }

        Ok(())
    }
}

fn config_error(reason: String) -> CarechainError {
    CarechainError::ConfigError { reason }
}

fn default_forward_action() -> String {
    "FORWARD".to_string()
}

fn default_forwarding() -> String {
    "Forwarding...".to_string()
}

fn default_forwarded() -> String {
    "Forwarded".to_string()
}

fn default_received() -> String {
    "Received".to_string()
}
