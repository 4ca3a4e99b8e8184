//! Tool registry with uniform audit wrapping.
//!
//! Every call through `run_with_audit` produces exactly one `AuditLogEntry`:
//! success, handler failure, refusal, or a panic inside the handler. Only a
//! failure to append that entry is returned as `Err`.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    plan::ToolName,
    trace::{AuditLogEntry, ToolCallStatus, TraceId},
};

use crate::{
    tools::{
        CheckBalanceTool, ExecutePurchaseTool, SearchProductsTool, ToolFailure, ToolHandler,
        UpdateDatabaseTool,
    },
    traits::{AuditWriter, CommerceServices},
};

/// What one audited tool invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool: ToolName,
    pub status: ToolCallStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == ToolCallStatus::Ok
    }

    /// The error text, or an empty string on success.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

pub struct ToolRegistry {
    handlers: HashMap<ToolName, Box<dyn ToolHandler>>,
    audit: Arc<dyn AuditWriter>,
}

impl ToolRegistry {
    pub fn new(audit: Arc<dyn AuditWriter>) -> Self {
        Self { handlers: HashMap::new(), audit }
    }

    /// A registry holding exactly the four backend tools.
    pub fn standard(services: CommerceServices, audit: Arc<dyn AuditWriter>) -> Self {
        let mut registry = Self::new(audit);
        registry.register(Box::new(CheckBalanceTool::new(services.accounts.clone())));
        registry.register(Box::new(SearchProductsTool::new(services.catalog.clone())));
        registry.register(Box::new(ExecutePurchaseTool::new(services)));
        registry.register(Box::new(UpdateDatabaseTool));
        registry
    }

    /// Register a handler, replacing any previous handler for the same tool.
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Invoke `tool` with `args` and append one audit entry for the attempt.
    pub fn run_with_audit(
        &self,
        trace_id: &TraceId,
        tool: ToolName,
        args: &Map<String, Value>,
    ) -> SentinelResult<ToolOutcome> {
        let handler = self
            .handlers
            .get(&tool)
            .ok_or_else(|| SentinelError::ToolNotRegistered { tool: tool.to_string() })?;

        debug!(trace_id = %trace_id, tool = %tool, "invoking tool");

        let result = catch_unwind(AssertUnwindSafe(|| handler.invoke(args)));

        let outcome = match result {
            Ok(Ok(output)) => ToolOutcome {
                tool,
                status: ToolCallStatus::Ok,
                output: Some(output),
                error: None,
            },
            Ok(Err(ToolFailure::Blocked(reason))) => ToolOutcome {
                tool,
                status: ToolCallStatus::Blocked,
                output: None,
                error: Some(reason),
            },
            Ok(Err(ToolFailure::Failed(reason))) => ToolOutcome {
                tool,
                status: ToolCallStatus::Error,
                output: None,
                error: Some(reason),
            },
            Err(panic) => ToolOutcome {
                tool,
                status: ToolCallStatus::Error,
                output: None,
                error: Some(panic_message(panic.as_ref())),
            },
        };

        if !outcome.is_ok() {
            warn!(
                trace_id = %trace_id,
                tool = %tool,
                status = ?outcome.status,
                error = %outcome.error_text(),
                "tool invocation did not succeed"
            );
        }

        let entry = AuditLogEntry {
            id: uuid::Uuid::new_v4(),
            trace_id: trace_id.clone(),
            tool_name: tool,
            status: outcome.status,
            input: Value::Object(args.clone()),
            output: outcome.output.clone(),
            error: outcome.error.clone(),
            created_at: Utc::now(),
        };
        self.audit.append(&entry)?;

        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("internal error: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("internal error: {s}")
    } else {
        "internal error".to_string()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
