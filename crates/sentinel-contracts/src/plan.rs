//! Agent plan types.
//!
//! An `AgentPlan` is the structured representation of what the agent intends
//! to do for one user turn. Plans come from an untrusted generator, so the
//! step type is a closed enum: "exactly one payload per step" is a property
//! of the type, not a runtime check scattered across callers.
//!
//! On the wire (storage snapshots, oracle output) a step is the flat record
//! `{ step_type, tool_call, user_message }`. `PlanStepWire` is that record and
//! the `TryFrom` conversion is the only way back into a `PlanStep`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the user is trying to accomplish this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CheckBalance,
    Purchase,
    UpdateRecord,
    #[default]
    Unknown,
}

/// The closed set of backend tools a plan may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CheckBalance,
    SearchProducts,
    ExecutePurchase,
    UpdateDatabase,
}

impl ToolName {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckBalance => "check_balance",
            ToolName::SearchProducts => "search_products",
            ToolName::ExecutePurchase => "execute_purchase",
            ToolName::UpdateDatabase => "update_database",
        }
    }

    /// Tools that act on behalf of a specific user and need `user_id`.
    pub fn requires_identity(&self) -> bool {
        matches!(self, ToolName::CheckBalance | ToolName::ExecutePurchase)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single planned tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: ToolName,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: ToolName, arguments: Map<String, Value>) -> Self {
        Self { tool_name, arguments }
    }

    /// Return the argument as a non-empty string, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Coarse risk classification attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlanStepWire", into = "PlanStepWire")]
pub enum PlanStep {
    /// Invoke a tool through the registry.
    ToolCall(ToolCall),
    /// Stop and relay a question to the user.
    AskUser { user_message: String },
    /// Nothing left to do.
    Done,
}

impl PlanStep {
    pub fn tool(tool_name: ToolName, arguments: Map<String, Value>) -> Self {
        PlanStep::ToolCall(ToolCall::new(tool_name, arguments))
    }

    pub fn ask(user_message: impl Into<String>) -> Self {
        PlanStep::AskUser { user_message: user_message.into() }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            PlanStep::ToolCall(call) => Some(call),
            _ => None,
        }
    }
}

/// Wire discriminant for `PlanStepWire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepType {
    ToolCall,
    AskUser,
    Done,
}

/// Flat wire form of a step, as produced by external generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStepWire {
    pub step_type: PlanStepType,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
    #[serde(default)]
    pub user_message: Option<String>,
}

impl TryFrom<PlanStepWire> for PlanStep {
    type Error = String;

    fn try_from(wire: PlanStepWire) -> Result<Self, Self::Error> {
        let has_message = wire
            .user_message
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());

        match wire.step_type {
            PlanStepType::ToolCall => match (wire.tool_call, has_message) {
                (Some(call), false) => Ok(PlanStep::ToolCall(call)),
                (None, _) => Err("tool_call step is missing its tool_call payload".to_string()),
                (Some(_), true) => {
                    Err("tool_call step must not also carry a user_message".to_string())
                }
            },
            PlanStepType::AskUser => match (wire.user_message, wire.tool_call) {
                (Some(user_message), None) if has_message => Ok(PlanStep::AskUser { user_message }),
                (_, Some(_)) => Err("ask_user step must not carry a tool_call".to_string()),
                _ => Err("ask_user step is missing its user_message".to_string()),
            },
            PlanStepType::Done => {
                if wire.tool_call.is_some() || has_message {
                    Err("done step must not carry a payload".to_string())
                } else {
                    Ok(PlanStep::Done)
                }
            }
        }
    }
}

impl From<PlanStep> for PlanStepWire {
    fn from(step: PlanStep) -> Self {
        match step {
            PlanStep::ToolCall(call) => PlanStepWire {
                step_type: PlanStepType::ToolCall,
                tool_call: Some(call),
                user_message: None,
            },
            PlanStep::AskUser { user_message } => PlanStepWire {
                step_type: PlanStepType::AskUser,
                tool_call: None,
                user_message: Some(user_message),
            },
            PlanStep::Done => PlanStepWire {
                step_type: PlanStepType::Done,
                tool_call: None,
                user_message: None,
            },
        }
    }
}

/// The agent's plan for one turn.
///
/// Steps are ordered. Execution walks them in sequence and stops at the
/// first step that needs user input or produces a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentPlan {
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub confirmation_summary: Option<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl AgentPlan {
    /// A plan consisting of a single question for the user.
    pub fn ask(intent: Intent, user_message: impl Into<String>) -> Self {
        Self {
            intent,
            steps: vec![PlanStep::ask(user_message)],
            ..Self::default()
        }
    }

    /// Iterate over every tool call in step order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.steps.iter().filter_map(PlanStep::as_tool_call)
    }

    pub fn has_tool(&self, tool_name: ToolName) -> bool {
        self.tool_calls().any(|c| c.tool_name == tool_name)
    }

    /// The first `execute_purchase` call, if any.
    pub fn purchase_call(&self) -> Option<&ToolCall> {
        self.tool_calls().find(|c| c.tool_name == ToolName::ExecutePurchase)
    }

    /// The message of the first `ask_user` step, if any.
    pub fn first_ask_user(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| match s {
            PlanStep::AskUser { user_message } => Some(user_message.as_str()),
            _ => None,
        })
    }
}
