//! Plan verification schema and report types.
//!
//! Before any externally generated plan is used, the verifier checks the raw
//! payload against a `PlanSchema`. Only a passing `VerificationReport` lets
//! the payload become an `AgentPlan`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an untrusted plan payload is checked against.
///
/// Combines a JSON Schema document with business rules that JSON Schema
/// cannot express.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSchema {
    /// Unique identifier for this schema (e.g. "agent-plan-strict-v1").
    pub schema_id: String,
    /// A JSON Schema document used for structural validation.
    pub json_schema: Value,
    /// Semantic rules evaluated on the typed plan after structural validation.
    pub rules: Vec<PlanRule>,
}

/// The semantic checks applied to a structurally valid plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanRule {
    /// Purchase intent or any purchase call must set `requires_confirmation`.
    PurchaseRequiresConfirmation,
    /// No tool call may have an empty argument map.
    NonEmptyToolArguments,
    /// A plan must contain at least one step.
    NonEmptySteps,
}

impl PlanRule {
    pub fn rule_id(&self) -> &'static str {
        match self {
            PlanRule::PurchaseRequiresConfirmation => "purchase-requires-confirmation",
            PlanRule::NonEmptyToolArguments => "non-empty-tool-arguments",
            PlanRule::NonEmptySteps => "non-empty-steps",
        }
    }
}

/// The result of running a `PlanSchema` against a payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if every check passed.
    pub passed: bool,
    /// All failures collected during this run. Empty on pass.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// One-line `[rule] message; …` summary for logs and errors.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub rule_id: String,
    pub message: String,
}
