//! # carechain-audit
//!
//! Append-only, SHA-256 hash-chained audit log for the carechain workflow.
//!
//! ## Overview
//!
//! Every entry the transition engine appends links to the previous entry
//! through its integrity tag. Changing any stored entry, even a single
//! byte of its details, breaks the chain and `verify_chain` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carechain_audit::InMemoryAuditLog;
//! use carechain_core::traits::AuditSink;
//!
//! let log = InMemoryAuditLog::new("run-001");
//! log.append(AuditDraft::new(AgentRole::Patient, "ADMIT", "Record admitted."));
//!
//! assert!(log.verify_integrity());
//! let sealed = log.export_log();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{tag_entry, verify_chain};
pub use event::{AuditLog, GENESIS_TAG};
pub use memory::InMemoryAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use carechain_contracts::{
        audit::{AuditDraft, Metrics},
        role::AgentRole,
    };
    use carechain_core::traits::AuditSink;

    use super::{verify_chain, InMemoryAuditLog, GENESIS_TAG};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn draft(action: &str, details: &str) -> AuditDraft {
        AuditDraft::new(AgentRole::GeneralDoctor, action, details)
    }

    fn three_entry_log(run_id: &str) -> InMemoryAuditLog {
        let log = InMemoryAuditLog::new(run_id);
        log.append(draft("ADMIT", "first"));
        log.append(draft("LOCK", "second"));
        log.append(draft("SUBMIT", "third"));
        log
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_hash_chain_integrity() {
        let log = three_entry_log("run-integrity");
        assert!(log.verify_integrity(), "chain must be valid after sequential appends");
        assert!(log.verify());
    }

    /// Editing a stored entry's details breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let log = three_entry_log("run-tamper");

        {
            let mut state = log.state.lock().unwrap();
            state.entries[0].details = "TAMPERED".to_string();
        }

        assert!(!log.verify_integrity(), "chain must detect an edited entry");
    }

    /// Dropping an entry from the middle breaks linkage.
    #[test]
    fn test_removal_detection() {
        let log = three_entry_log("run-removal");
        let mut entries = log.entries();
        entries.remove(1);
        assert!(!verify_chain("run-removal", &entries));
    }

    #[test]
    fn test_tampered_metrics_detected() {
        let log = InMemoryAuditLog::new("run-metrics");
        let mut metrics = Metrics::new();
        metrics.insert("charge".to_string(), 150.0.into());
        log.append(draft("REFERRAL", "referred").with_metrics(metrics));

        let mut entries = log.entries();
        if let Some(m) = entries[0].metrics.as_mut() {
            m.insert("charge".to_string(), 1.0.into());
        }
        assert!(!verify_chain("run-metrics", &entries));
    }

    #[test]
    fn test_chain_is_bound_to_its_run() {
        let log = three_entry_log("run-a");
        assert!(!verify_chain("run-b", &log.entries()));
    }

    #[test]
    fn test_genesis_tag() {
        let log = InMemoryAuditLog::new("run-genesis");
        let entry = log.append(draft("ADMIT", "first"));
        assert_eq!(entry.prev_tag, GENESIS_TAG, "first entry must link to the genesis tag");
    }

    #[test]
    fn test_sequence_monotonic() {
        let log = three_entry_log("run-seq");
        for (idx, entry) in log.entries().iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64, "sequence at position {idx} should be {idx}");
        }
    }

    #[test]
    fn test_tags_and_ids_are_unique() {
        let log = InMemoryAuditLog::new("run-unique");
        for _ in 0..50 {
            log.append(draft("FORWARD", "same details every time"));
        }
        let entries = log.entries();
        let tags: HashSet<&str> = entries.iter().map(|e| e.integrity_tag.as_str()).collect();
        let ids: HashSet<uuid::Uuid> = entries.iter().map(|e| e.id).collect();
        assert_eq!(tags.len(), 50);
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_append_returns_the_stored_entry() {
        let log = InMemoryAuditLog::new("run-return");
        let returned = log.append(draft("ADMIT", "first").with_formula(Some("x + y".to_string())));
        assert_eq!(log.entries(), vec![returned.clone()]);
        assert_eq!(returned.formula.as_deref(), Some("x + y"));
        assert!(returned.metrics.is_none());
    }

    #[test]
    fn test_export_log() {
        let log = three_entry_log("run-export");
        let exported = log.export_log();

        assert_eq!(exported.run_id, "run-export");
        assert_eq!(exported.entries.len(), 3);
        assert_eq!(
            exported.terminal_tag,
            exported.entries.last().unwrap().integrity_tag,
            "terminal_tag must equal the last entry's integrity_tag"
        );
        assert!(verify_chain(&exported.run_id, &exported.entries));
    }

    #[test]
    fn test_clear_starts_fresh_chain() {
        let log = three_entry_log("run-clear");
        log.clear();
        assert!(log.entries().is_empty());
        assert_eq!(log.export_log().terminal_tag, "");

        let entry = log.append(draft("ADMIT", "again"));
        assert_eq!(entry.sequence, 0);
        assert_eq!(entry.prev_tag, GENESIS_TAG);
        assert!(log.verify_integrity());
    }

    #[test]
    fn test_verify_empty() {
        let log = InMemoryAuditLog::new("run-empty");
        assert!(log.verify_integrity(), "an empty chain must be considered valid");
        assert!(verify_chain("run-empty", &[]));
    }
}
