//! Hash-chain primitives: tagging entries and verifying a chain.
//!
//! Tag input layout (bytes, in order):
//!   1. run_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_tag as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the entry body (serde_json, no pretty-printing)
//!
//! The body is every entry field except the two tags themselves.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use carechain_contracts::{
    audit::{AuditEntry, Metrics},
    role::AgentRole,
};

use crate::event::GENESIS_TAG;

/// The hashed portion of an audit entry.
#[derive(Debug, Serialize)]
pub struct EntryBody<'a> {
    pub id: &'a uuid::Uuid,
    pub timestamp: &'a DateTime<Utc>,
    pub source: AgentRole,
    pub action: &'a str,
    pub details: &'a str,
    pub metrics: Option<&'a Metrics>,
    pub formula: Option<&'a str>,
    pub derivation: Option<&'a [String]>,
}

impl<'a> EntryBody<'a> {
    pub fn of(entry: &'a AuditEntry) -> Self {
        Self {
            id: &entry.id,
            timestamp: &entry.timestamp,
            source: entry.source,
            action: &entry.action,
            details: &entry.details,
            metrics: entry.metrics.as_ref(),
            formula: entry.formula.as_deref(),
            derivation: entry.derivation.as_deref(),
        }
    }
}

/// Compute the integrity tag for one entry.
///
/// Returns a lowercase 64-character hex string.
pub fn tag_entry(run_id: &str, sequence: u64, prev_tag: &str, body: &EntryBody<'_>) -> String {
    // Every body field is a string, number, or map of those, so encoding
    // cannot fail; an empty body would still produce a stable tag.
    let body_json = serde_json::to_vec(body).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(run_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_tag.as_bytes());
    hasher.update(&body_json);

    hex::encode(hasher.finalize())
}

/// Verify the integrity of a chain of entries from run `run_id`.
///
/// Valid when, for every entry in order:
///
/// 1. **Sequence** — `sequence` equals the entry's position.
/// 2. **Linkage** — `prev_tag` equals the preceding entry's
///    `integrity_tag` (or `GENESIS_TAG` for entry 0).
/// 3. **Tag correctness** — `integrity_tag` matches the tag recomputed
///    from the entry's own fields.
///
/// An empty chain is valid.
pub fn verify_chain(run_id: &str, entries: &[AuditEntry]) -> bool {
    let mut expected_prev = GENESIS_TAG.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_tag != expected_prev {
            return false;
        }

        let recomputed = tag_entry(run_id, entry.sequence, &entry.prev_tag, &EntryBody::of(entry));
        if entry.integrity_tag != recomputed {
            return false;
        }

        expected_prev = entry.integrity_tag.clone();
    }

    true
}
