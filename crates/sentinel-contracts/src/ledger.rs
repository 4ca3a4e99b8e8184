//! Confirmation ledger entry types.
//!
//! A `PendingConfirmation` binds a single-use token to a fully resolved,
//! execution-ready tool call. The arguments already contain the identity,
//! a fresh idempotency key, and `confirm = true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{plan::ToolName, trace::TraceId};

/// Opaque single-use credential gating one sensitive action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationToken(pub String);

impl ConfirmationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub token: ConfirmationToken,
    pub tool_name: ToolName,
    pub tool_args: Map<String, Value>,
}

/// Lifecycle of a ledger entry. Only `Issued` entries can be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    Issued,
    Consumed,
}

/// A ledger row: the pending call plus ownership and lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub pending: PendingConfirmation,
    pub session_id: String,
    /// The trace that issued this confirmation.
    pub trace_id: TraceId,
    pub state: LedgerState,
    pub issued_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}
