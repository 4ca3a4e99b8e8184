//! In-memory session memory and confirmation ledger.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::{LedgerEntry, LedgerState, PendingConfirmation},
    session::SessionMemory,
    trace::TraceId,
};
use sentinel_core::traits::{ConfirmationLedger, SessionStore};

fn poisoned(what: &str, e: impl std::fmt::Display) -> SentinelError {
    SentinelError::Storage { reason: format!("{what} lock poisoned: {e}") }
}

// ── Session memory ────────────────────────────────────────────────────────────

/// Latest-value session memory, keyed by session id.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionMemory>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, HashMap<String, SessionMemory>>> {
        self.sessions.lock().map_err(|e| poisoned("session store", e))
    }

    pub fn clear(&self) -> SentinelResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> SentinelResult<SessionMemory> {
        Ok(self.lock()?.get(session_id).cloned().unwrap_or_default())
    }

    fn save(&self, session_id: &str, memory: &SessionMemory) -> SentinelResult<()> {
        self.lock()?.insert(session_id.to_string(), memory.clone());
        Ok(())
    }
}

// ── Confirmation ledger ───────────────────────────────────────────────────────

/// Token-indexed ledger. Entries are never removed, only marked consumed.
#[derive(Default)]
pub struct InMemoryConfirmationLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl InMemoryConfirmationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, HashMap<String, LedgerEntry>>> {
        self.entries.lock().map_err(|e| poisoned("confirmation ledger", e))
    }

    pub fn len(&self) -> SentinelResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> SentinelResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn clear(&self) -> SentinelResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

impl ConfirmationLedger for InMemoryConfirmationLedger {
    fn issue(
        &self,
        session_id: &str,
        trace_id: &TraceId,
        pending: PendingConfirmation,
    ) -> SentinelResult<()> {
        let mut entries = self.lock()?;
        let token = pending.token.as_str().to_string();
        if entries.contains_key(&token) {
            return Err(SentinelError::Storage {
                reason: "confirmation token already issued".to_string(),
            });
        }
        entries.insert(
            token,
            LedgerEntry {
                pending,
                session_id: session_id.to_string(),
                trace_id: trace_id.clone(),
                state: LedgerState::Issued,
                issued_at: Utc::now(),
                consumed_at: None,
            },
        );
        debug!(session_id = %session_id, trace_id = %trace_id, "confirmation issued");
        Ok(())
    }

    fn find(&self, session_id: &str, token: &str) -> SentinelResult<Option<LedgerEntry>> {
        Ok(self
            .lock()?
            .get(token)
            .filter(|e| e.session_id == session_id)
            .cloned())
    }

    fn consume(&self, token: &str) -> SentinelResult<Option<LedgerEntry>> {
        let mut entries = self.lock()?;
        match entries.get_mut(token) {
            Some(entry) if entry.state == LedgerState::Issued => {
                entry.state = LedgerState::Consumed;
                entry.consumed_at = Some(Utc::now());
                info!(trace_id = %entry.trace_id, "confirmation consumed");
                Ok(Some(entry.clone()))
            }
            _ => Ok(None),
        }
    }
}
