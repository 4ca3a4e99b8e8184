//! In-memory implementation of `AuditWriter`.
//!
//! `InMemoryAuditTrail` keeps one hash chain per trace behind a `Mutex`, so
//! the registry can append from any thread. Entries of different traces never
//! share a chain, which lets a trace's entries be purged with it without
//! breaking anyone else's chain.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    trace::{AuditLogEntry, TraceId},
};
use sentinel_core::traits::AuditWriter;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AuditEvent, TraceAuditLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// One trace's chain.
#[derive(Default)]
pub(crate) struct TraceChain {
    pub(crate) events: Vec<AuditEvent>,
}

impl TraceChain {
    fn last_hash(&self) -> &str {
        self.events
            .last()
            .map(|e| e.this_hash.as_str())
            .unwrap_or(AuditEvent::GENESIS_HASH)
    }
}

#[derive(Default)]
pub(crate) struct TrailState {
    pub(crate) chains: HashMap<TraceId, TraceChain>,
}

// ── Public trail ──────────────────────────────────────────────────────────────

/// An in-memory, append-only audit trail with a SHA-256 chain per trace.
#[derive(Clone, Default)]
pub struct InMemoryAuditTrail {
    pub(crate) state: Arc<Mutex<TrailState>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, TrailState>> {
        self.state.lock().map_err(|e| SentinelError::Storage {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }

    /// Export the chain of one trace, or `None` if it has no entries.
    pub fn export_trace(&self, trace_id: &TraceId) -> SentinelResult<Option<TraceAuditLog>> {
        let state = self.lock()?;
        Ok(state.chains.get(trace_id).map(|chain| TraceAuditLog {
            trace_id: trace_id.clone(),
            events: chain.events.clone(),
            exported_at: Utc::now(),
            terminal_hash: chain.last_hash().to_string(),
        }))
    }

    /// Verify every chain. A poisoned lock counts as a failure.
    pub fn verify_integrity(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.chains.values().all(|c| verify_chain(&c.events)),
            Err(_) => false,
        }
    }

    /// Total number of entries across all traces.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.chains.values().map(|c| c.events.len()).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── AuditWriter impl ──────────────────────────────────────────────────────────

impl AuditWriter for InMemoryAuditTrail {
    /// Append one entry to the chain of its trace.
    fn append(&self, entry: &AuditLogEntry) -> SentinelResult<()> {
        let mut state = self.lock()?;
        let chain = state.chains.entry(entry.trace_id.clone()).or_default();

        let sequence = chain.events.len() as u64;
        let prev_hash = chain.last_hash().to_string();
        let this_hash = hash_event(&entry.trace_id, sequence, entry, &prev_hash).map_err(|e| {
            SentinelError::Storage { reason: format!("audit entry is not serializable: {}", e) }
        })?;

        debug!(
            trace_id = %entry.trace_id,
            tool = %entry.tool_name,
            sequence,
            "audit entry appended"
        );

        chain.events.push(AuditEvent {
            sequence,
            trace_id: entry.trace_id.clone(),
            entry: entry.clone(),
            prev_hash,
            this_hash,
        });
        Ok(())
    }

    fn entries_for_trace(&self, trace_id: &TraceId) -> SentinelResult<Vec<AuditLogEntry>> {
        let state = self.lock()?;
        Ok(state
            .chains
            .get(trace_id)
            .map(|c| c.events.iter().map(|e| e.entry.clone()).collect())
            .unwrap_or_default())
    }

    fn purge_trace(&self, trace_id: &TraceId) -> SentinelResult<usize> {
        let mut state = self.lock()?;
        let removed = state.chains.remove(trace_id).map(|c| c.events.len()).unwrap_or(0);
        if removed > 0 {
            info!(trace_id = %trace_id, removed, "audit entries purged with their trace");
        }
        Ok(removed)
    }
}
