//! TOML-driven routing policy.
//!
//! `TomlRoutingPolicy` loads a `RoutingTable` from a TOML string or file,
//! validates it, and answers static "may this role attempt this action"
//! questions for callers such as a CLI or UI.
//!
//! Evaluation is deny-by-default:
//!
//! 1. A role with no route may do nothing.
//! 2. Admit, amend, lock, and unlock belong to the owner route alone.
//! 3. A forward is allowed only to a target listed in the route.
//! 4. A compute is allowed only when the route declares one.

use std::path::Path;

use tracing::{debug, info};

use carechain_contracts::{
    action::Action,
    error::{CarechainError, CarechainResult},
    record::Payload,
    role::AgentRole,
    routing::RoutingTable,
};

use crate::rule::{validate, RouteVerdict};

/// A validated routing table read from TOML.
///
/// ```rust,ignore
/// use carechain_policy::TomlRoutingPolicy;
///
/// let policy = TomlRoutingPolicy::from_file(Path::new("policies/routing.toml"))?;
/// let engine = TransitionEngine::new(policy.into_table(), computation, advisor, audit)?;
/// ```
#[derive(Debug, Clone)]
pub struct TomlRoutingPolicy {
    table: RoutingTable,
}

impl TomlRoutingPolicy {
    /// Parse `s` as TOML and build a validated policy.
    ///
    /// Returns `CarechainError::ConfigError` if the TOML is malformed, does
    /// not match the `RoutingTable` schema, or breaks a table rule.
    pub fn from_toml_str(s: &str) -> CarechainResult<Self> {
        let table: RoutingTable = toml::from_str(s).map_err(|e| CarechainError::ConfigError {
            reason: format!("failed to parse routing TOML: {}", e),
        })?;
        validate(&table)?;

        info!(routes = table.routes.len(), "routing table loaded");
        Ok(Self { table })
    }

    /// Read the file at `path` and parse it as a routing table.
    pub fn from_file(path: &Path) -> CarechainResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CarechainError::ConfigError {
            reason: format!("failed to read routing file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Hand the table to the transition engine.
    pub fn into_table(self) -> RoutingTable {
        self.table
    }

    /// Judge whether `role` may attempt `action`, from the table alone.
    pub fn evaluate(&self, role: AgentRole, action: &Action) -> RouteVerdict {
        let Some(route) = self.table.route(role) else {
            debug!(role = %role, action = action.name(), "no route for role; denying by default");
            return RouteVerdict::Deny {
                reason: format!("denied by default: no route for role '{}'", role.slug()),
            };
        };

        let verdict = match route.permits(action) {
            Ok(()) => RouteVerdict::Allow,
            Err(rejection) => RouteVerdict::Deny {
                reason: rejection.to_string(),
            },
        };

        debug!(role = %role, action = action.name(), allowed = verdict.is_allowed(), "route evaluated");
        verdict
    }

    /// Every action `role` may attempt, in canonical order, with forwards
    /// expanded per target. Exactly the actions `evaluate` allows, up to
    /// payload contents.
    pub fn permitted_actions(&self, role: AgentRole) -> Vec<Action> {
        let Some(route) = self.table.route(role) else {
            return vec![];
        };

        let mut actions = vec![];
        if route.owner {
            actions.push(Action::Admit { payload: None });
            actions.push(Action::Amend { payload: Payload::default() });
            actions.push(Action::Lock);
            actions.push(Action::Unlock);
        }
        for target in &route.forward_targets {
            actions.push(Action::Forward { target: *target });
        }
        if route.compute.is_some() {
            actions.push(Action::Compute);
        }
        actions
    }
}
