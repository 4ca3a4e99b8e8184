//! In-memory implementation of `TraceStore`.
//!
//! Traces are kept in creation order. A trace is written once on creation and
//! updated once with the turn's outcome; deleting it purges its audit entries.
//!
//! `sessions` and `timeline` are the read side used to inspect past
//! conversations: which sessions exist, and what each turn planned and ran.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::PendingConfirmation,
    plan::AgentPlan,
    trace::{AuditLogEntry, Trace, TraceId},
};
use sentinel_core::traits::{AuditWriter, TraceStore};

/// One session and the time of its newest trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub last_activity: DateTime<Utc>,
}

/// A trace with the audit entries of the tool calls it made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineTurn {
    #[serde(flatten)]
    pub trace: Trace,
    pub audit_logs: Vec<AuditLogEntry>,
}

/// The turns of one session, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionTimeline {
    pub session_id: String,
    pub turns: Vec<TimelineTurn>,
}

pub struct InMemoryTraceStore {
    traces: Mutex<Vec<Trace>>,
    audit: Arc<dyn AuditWriter>,
}

impl InMemoryTraceStore {
    /// `audit` is the trail whose entries are purged along with their trace.
    pub fn new(audit: Arc<dyn AuditWriter>) -> Self {
        Self { traces: Mutex::new(Vec::new()), audit }
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, Vec<Trace>>> {
        self.traces.lock().map_err(|e| SentinelError::Storage {
            reason: format!("trace store lock poisoned: {}", e),
        })
    }

    /// All traces of a session, oldest first.
    pub fn session_traces(&self, session_id: &str) -> SentinelResult<Vec<Trace>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }

    /// Distinct sessions, most recently active first, at most `limit`.
    pub fn sessions(&self, limit: usize) -> SentinelResult<Vec<SessionSummary>> {
        let traces = self.lock()?;
        let mut seen = HashSet::new();
        Ok(traces
            .iter()
            .rev()
            .filter(|t| seen.insert(t.session_id.as_str()))
            .take(limit)
            .map(|t| SessionSummary {
                session_id: t.session_id.clone(),
                last_activity: t.created_at,
            })
            .collect())
    }

    /// The latest `limit` turns of a session in chronological order, each
    /// with its audit entries.
    pub fn timeline(&self, session_id: &str, limit: usize) -> SentinelResult<SessionTimeline> {
        let mut recent = self.recent(session_id, limit)?;
        recent.reverse();

        let mut turns = Vec::with_capacity(recent.len());
        for trace in recent {
            let audit_logs = self.audit.entries_for_trace(&trace.id)?;
            turns.push(TimelineTurn { trace, audit_logs });
        }
        Ok(SessionTimeline { session_id: session_id.to_string(), turns })
    }

    pub fn clear(&self) -> SentinelResult<()> {
        let drained: Vec<Trace> = self.lock()?.drain(..).collect();
        for trace in drained {
            self.audit.purge_trace(&trace.id)?;
        }
        Ok(())
    }
}

impl TraceStore for InMemoryTraceStore {
    fn create(&self, session_id: &str, user_message: &str) -> SentinelResult<Trace> {
        let trace = Trace {
            id: TraceId::new(),
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            assistant_message: None,
            plan: None,
            pending_confirmation: None,
            created_at: Utc::now(),
        };
        self.lock()?.push(trace.clone());
        debug!(trace_id = %trace.id, session_id = %session_id, "trace created");
        Ok(trace)
    }

    fn update(
        &self,
        trace_id: &TraceId,
        assistant_message: &str,
        plan: Option<&AgentPlan>,
        pending: Option<&PendingConfirmation>,
    ) -> SentinelResult<()> {
        let mut traces = self.lock()?;
        let trace = traces
            .iter_mut()
            .find(|t| &t.id == trace_id)
            .ok_or_else(|| SentinelError::Storage { reason: format!("trace {trace_id} not found") })?;

        if trace.assistant_message.is_some() {
            return Err(SentinelError::Storage {
                reason: format!("trace {trace_id} was already finalized"),
            });
        }

        trace.assistant_message = Some(assistant_message.to_string());
        trace.plan = plan.cloned();
        trace.pending_confirmation = pending.cloned();
        Ok(())
    }

    fn get(&self, trace_id: &TraceId) -> SentinelResult<Option<Trace>> {
        Ok(self.lock()?.iter().find(|t| &t.id == trace_id).cloned())
    }

    fn recent(&self, session_id: &str, limit: usize) -> SentinelResult<Vec<Trace>> {
        Ok(self
            .lock()?
            .iter()
            .rev()
            .filter(|t| t.session_id == session_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn delete(&self, trace_id: &TraceId) -> SentinelResult<bool> {
        let removed = {
            let mut traces = self.lock()?;
            let before = traces.len();
            traces.retain(|t| &t.id != trace_id);
            traces.len() != before
        };
        if removed {
            self.audit.purge_trace(trace_id)?;
        }
        Ok(removed)
    }
}
