//! Collaborator traits for the carechain transition engine.
//!
//! These three traits are the engine's only seams:
//!
//! - `ComputationProvider` — opaque per-operation transform of a record
//! - `AdvisoryProvider`    — asynchronous charge and narrative per agent step
//! - `AuditSink`           — append-only record of every committed step
//!
//! The engine owns one of each and is the only caller.

use std::sync::Arc;

use futures::future::BoxFuture;

use carechain_contracts::{
    audit::{AuditDraft, AuditEntry},
    error::CarechainResult,
    provider::{Advice, AdvisoryRequest, Computation},
    record::Record,
};

/// Performs the opaque numeric transform behind an operation name.
///
/// Implementations must be pure with respect to the input record: read it,
/// return a transformed copy, keep no hidden shared state. The engine treats
/// an `Err` as a provider failure and applies nothing.
pub trait ComputationProvider: Send + Sync {
    /// Transform `record` according to `operation` (e.g. "lock", "diagnosis").
    ///
    /// The returned record must keep the input's id and payload shape.
    fn transform(&self, operation: &str, record: &Record) -> CarechainResult<Computation>;
}

/// Produces a charge, narrative, and optional severity for one agent's step.
///
/// The call is asynchronous with unspecified latency. It has no error path:
/// implementations resolve to a documented per-role fallback on any failure,
/// and the engine trusts that answer without retrying.
pub trait AdvisoryProvider: Send + Sync {
    fn advise(&self, request: AdvisoryRequest) -> BoxFuture<'_, Advice>;
}

/// The audit log as seen by the engine.
///
/// `append` never fails and never reorders or removes prior entries. The
/// engine calls `clear` only from its reset operation.
pub trait AuditSink: Send + Sync {
    /// Seal `draft` into the next entry and return a copy of it.
    fn append(&self, draft: AuditDraft) -> AuditEntry;

    /// Every entry, in append order.
    fn entries(&self) -> Vec<AuditEntry>;

    /// True when the stored entries have not been tampered with.
    fn verify(&self) -> bool;

    /// Drop every entry and start a fresh log.
    fn clear(&self);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn append(&self, draft: AuditDraft) -> AuditEntry {
        (**self).append(draft)
    }

    fn entries(&self) -> Vec<AuditEntry> {
        (**self).entries()
    }

    fn verify(&self) -> bool {
        (**self).verify()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

impl<T: AdvisoryProvider + ?Sized> AdvisoryProvider for Arc<T> {
    fn advise(&self, request: AdvisoryRequest) -> BoxFuture<'_, Advice> {
        (**self).advise(request)
    }
}
