//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. trace_id as its hyphenated UTF-8 string
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the entry (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use sentinel_contracts::trace::{AuditLogEntry, TraceId};

use crate::event::AuditEvent;

/// Compute the SHA-256 hash for one audit event, as lowercase hex.
pub fn hash_event(
    trace_id: &TraceId,
    sequence: u64,
    entry: &AuditLogEntry,
    prev_hash: &str,
) -> Result<String, serde_json::Error> {
    let entry_json = serde_json::to_vec(entry)?;

    let mut hasher = Sha256::new();
    hasher.update(trace_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify one trace's chain.
///
/// Valid when every event links to its predecessor (or `GENESIS_HASH`),
/// carries the expected sequence number, belongs to the same trace, and its
/// stored hash matches the recomputed one. An empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.prev_hash != expected_prev || event.sequence != position as u64 {
            return false;
        }
        if event.entry.trace_id != event.trace_id {
            return false;
        }

        match hash_event(&event.trace_id, event.sequence, &event.entry, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
