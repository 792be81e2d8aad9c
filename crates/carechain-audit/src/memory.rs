//! In-memory implementation of `AuditSink`.
//!
//! `InMemoryAuditLog` keeps every entry in a `Vec` behind a `Mutex`. The
//! transition engine appends while holding its registry lock; readers take
//! copies with `entries()` or `export_log()`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use carechain_contracts::audit::{AuditDraft, AuditEntry};
use carechain_core::traits::AuditSink;

use crate::{
    chain::{tag_entry, verify_chain, EntryBody},
    event::{AuditLog, GENESIS_TAG},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LogState {
    /// All entries appended so far, in order.
    pub(crate) entries: Vec<AuditEntry>,

    /// `integrity_tag` of the last entry, or `GENESIS_TAG`.
    pub(crate) last_tag: String,
}

impl LogState {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            last_tag: GENESIS_TAG.to_string(),
        }
    }
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An append-only audit log backed by a SHA-256 hash chain.
///
/// Clones share the same underlying log.
#[derive(Clone)]
pub struct InMemoryAuditLog {
    run_id: String,
    pub(crate) state: Arc<Mutex<LogState>>,
}

impl InMemoryAuditLog {
    /// Create an empty log for the given run.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: Arc::new(Mutex::new(LogState::empty())),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Export a sealed `AuditLog` containing all entries appended so far.
    pub fn export_log(&self) -> AuditLog {
        let state = self.lock();
        let terminal_tag = state
            .entries
            .last()
            .map(|e| e.integrity_tag.clone())
            .unwrap_or_default();

        AuditLog {
            run_id: self.run_id.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_tag,
        }
    }

    /// Verify that the stored chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.run_id, &self.lock().entries)
    }

    // Append must never fail, so a poisoned lock is taken over as-is: the
    // state is only ever changed by a single push plus a tag update.
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

impl AuditSink for InMemoryAuditLog {
    /// Seal `draft` into the next entry of the chain.
    fn append(&self, draft: AuditDraft) -> AuditEntry {
        let mut state = self.lock();
        let sequence = state.entries.len() as u64;

        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            source: draft.source,
            action: draft.action,
            details: draft.details,
            metrics: draft.metrics,
            formula: draft.formula,
            derivation: draft.derivation,
            prev_tag: state.last_tag.clone(),
            integrity_tag: String::new(),
        };
        entry.integrity_tag =
            tag_entry(&self.run_id, sequence, &entry.prev_tag, &EntryBody::of(&entry));

        debug!(
            run_id = %self.run_id,
            sequence,
            action = %entry.action,
            tag = %entry.integrity_tag,
            "audit entry appended"
        );

        state.last_tag = entry.integrity_tag.clone();
        state.entries.push(entry.clone());
        entry
    }

    fn entries(&self) -> Vec<AuditEntry> {
        self.lock().entries.clone()
    }

    fn verify(&self) -> bool {
        self.verify_integrity()
    }

    fn clear(&self) {
        let mut state = self.lock();
        info!(
            run_id = %self.run_id,
            entry_count = state.entries.len(),
            terminal_tag = %state.last_tag,
            "audit log cleared"
        );
        *state = LogState::empty();
    }
}
