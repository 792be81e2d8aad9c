//! Exported audit log type and the genesis tag.
//!
//! Individual entries are the contract crate's `AuditEntry`; this module
//! adds the sealed snapshot a caller takes at the end of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carechain_contracts::audit::AuditEntry;

/// The `prev_tag` of the first entry in every chain.
///
/// 64 hex zeros, which no SHA-256 output of real data will collide with.
pub const GENESIS_TAG: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A sealed copy of one run's audit log.
///
/// Produced by `InMemoryAuditLog::export_log()`. The `terminal_tag` is the
/// `integrity_tag` of the last entry and commits to the whole log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// The workflow run these entries belong to.
    pub run_id: String,

    /// Every entry in append order (sequence 0 first).
    pub entries: Vec<AuditEntry>,

    /// Wall-clock time (UTC) the snapshot was taken.
    pub exported_at: DateTime<Utc>,

    /// Integrity tag of the last entry. Empty string for an empty log.
    pub terminal_tag: String,
}
