//! Audit event and export types.
//!
//! `AuditEvent` wraps one `AuditLogEntry` with its position in the owning
//! trace's chain and the SHA-256 hashes that make tampering detectable.
//! `TraceAuditLog` is the exported chain of a single trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_contracts::trace::{AuditLogEntry, TraceId};

/// A single link in the hash chain of one trace.
///
/// Modifying any field, including those of the embedded `entry`, invalidates
/// `this_hash` and every later `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the trace's chain, starting at 0.
    pub sequence: u64,

    pub trace_id: TraceId,

    /// The tool invocation record written by the registry.
    pub entry: AuditLogEntry,

    /// Hash of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash over (trace_id, sequence, prev_hash, canonical JSON of entry).
    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first event in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// The exported audit chain of one trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAuditLog {
    pub trace_id: TraceId,

    /// All events in chain order (sequence 0 first).
    pub events: Vec<AuditEvent>,

    pub exported_at: DateTime<Utc>,

    /// `this_hash` of the last event. Empty if the trace has no events.
    pub terminal_hash: String,
}
