//! The conversational endpoint's request and response.

use serde::{Deserialize, Serialize};

use crate::{ledger::ConfirmationToken, trace::TraceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    /// Externally authenticated identity, if known.
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
}

impl ChatRequest {
    pub fn new(
        session_id: impl Into<String>,
        user_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.map(str::to_string),
            message: message.into(),
        }
    }

    /// The identity, treating an empty string as absent.
    pub fn identity(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub trace_id: TraceId,
    pub session_id: String,
    pub message: String,
    pub needs_confirmation: bool,
    pub confirmation_token: Option<ConfirmationToken>,
}
