//! Well-formedness rules for a routing table, and the verdict type.
//!
//! A table is checked once, at load time. Every rule below must hold or the
//! whole table is rejected with a `ConfigError`; a partially valid table is
//! never handed to the engine.

use serde::{Deserialize, Serialize};

use carechain_contracts::{error::CarechainResult, routing::RoutingTable};

/// Whether a role may attempt an action at all, judged from the table alone.
///
/// `Allow` says nothing about the record's current state; the engine still
/// checks slot contents and confidentiality state when the action arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum RouteVerdict {
    Allow,
    Deny { reason: String },
}

impl RouteVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RouteVerdict::Allow)
    }
}

/// Check every table rule, returning the first violation.
///
/// The rules live on [`RoutingTable::validate`] so the transition engine
/// applies the same ones when it is built from a table directly.
pub fn validate(table: &RoutingTable) -> CarechainResult<()> {
    table.validate()
}
