//! Trace and audit entry types.
//!
//! A `Trace` is written once per inbound message and updated exactly once
//! after processing. An `AuditLogEntry` is written once per tool invocation
//! attempt and never modified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ledger::PendingConfirmation, plan::AgentPlan, plan::ToolName};

/// Unique identifier for one inbound message and everything it caused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(pub uuid::Uuid);

impl TraceId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The record of one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: TraceId,
    pub session_id: String,
    pub user_message: String,
    pub assistant_message: Option<String>,
    /// Snapshot of the plan generated for this turn, if any.
    pub plan: Option<AgentPlan>,
    /// Confirmation issued by this turn, if any.
    pub pending_confirmation: Option<PendingConfirmation>,
    pub created_at: DateTime<Utc>,
}

/// Outcome class of one tool invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Ok,
    Error,
    /// The handler refused to run (e.g. purchase without `confirm=true`).
    Blocked,
}

/// Immutable forensic record of one tool invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: uuid::Uuid,
    pub trace_id: TraceId,
    pub tool_name: ToolName,
    pub status: ToolCallStatus,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
