//! Plan verifier for untrusted plan payloads.
//!
//! `PlanVerifier` checks a raw JSON payload in three phases and collects
//! every failure before returning, so a rejected plan reports the full
//! failure set in one pass:
//!
//! 1. **Structural**: the payload is validated against
//!    `PlanSchema::json_schema` using the `jsonschema` crate.
//! 2. **Shape**: null members are stripped and the payload is deserialized
//!    into an `AgentPlan`, which enforces one payload per step.
//! 3. **Semantic**: each `PlanRule` in `PlanSchema::rules` is evaluated on
//!    the typed plan.
//!
//! Only `parse` turns a payload into an `AgentPlan`, and only when all three
//! phases pass.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    plan::{AgentPlan, Intent, ToolName},
    verify::{PlanRule, PlanSchema, VerificationFailure, VerificationReport},
};

use crate::schema::default_plan_schema;

const JSON_SCHEMA_RULE: &str = "json-schema";
const PLAN_SHAPE_RULE: &str = "plan-shape";

/// Verifies untrusted plan payloads against a `PlanSchema`.
pub struct PlanVerifier {
    schema: PlanSchema,
}

impl PlanVerifier {
    pub fn new(schema: PlanSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &PlanSchema {
        &self.schema
    }

    /// Run every phase and report all failures.
    pub fn verify(&self, payload: &Value) -> VerificationReport {
        let (failures, _) = self.check(payload);
        let passed = failures.is_empty();
        debug!(
            schema_id = %self.schema.schema_id,
            passed,
            failure_count = failures.len(),
            "plan verification complete"
        );
        VerificationReport { passed, failures }
    }

    /// Verify `payload` and return the plan it describes.
    ///
    /// Returns `SentinelError::SchemaValidation` when the payload is not
    /// structurally valid, and `SentinelError::PlanRejected` when it is but
    /// breaks the step shape or a semantic rule.
    pub fn parse(&self, payload: &Value) -> SentinelResult<AgentPlan> {
        let (failures, plan) = self.check(payload);
        let report = VerificationReport { passed: failures.is_empty(), failures };

        match plan {
            Some(plan) if report.passed => Ok(plan),
            _ if report.failures.iter().any(|f| f.rule_id == JSON_SCHEMA_RULE) => {
                Err(SentinelError::SchemaValidation { reason: report.summary() })
            }
            _ => Err(SentinelError::PlanRejected { reason: report.summary() }),
        }
    }

    fn check(&self, payload: &Value) -> (Vec<VerificationFailure>, Option<AgentPlan>) {
        let mut failures = Vec::new();

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        if !self.schema.json_schema.is_null() {
            match jsonschema::validator_for(&self.schema.json_schema) {
                Ok(validator) => {
                    for error in validator.iter_errors(payload) {
                        let message =
                            format!("JSON Schema violation at {}: {}", error.instance_path, error);
                        warn!(schema_id = %self.schema.schema_id, %message, "structural validation failure");
                        failures.push(failure(JSON_SCHEMA_RULE, message));
                    }
                }
                Err(e) => {
                    let message = format!("invalid JSON Schema document: {e}");
                    warn!(schema_id = %self.schema.schema_id, %message, "schema compilation failure");
                    failures.push(failure(JSON_SCHEMA_RULE, message));
                }
            }
        }
        if !failures.is_empty() {
            return (failures, None);
        }

        // ── Phase 2: typed plan ───────────────────────────────────────────────
        let plan = match serde_json::from_value::<AgentPlan>(strip_nulls(payload)) {
            Ok(plan) => plan,
            Err(e) => {
                let message = format!("payload is not a well-formed plan: {e}");
                warn!(schema_id = %self.schema.schema_id, %message, "plan shape failure");
                failures.push(failure(PLAN_SHAPE_RULE, message));
                return (failures, None);
            }
        };

        // ── Phase 3: semantic rules ───────────────────────────────────────────
        for rule in &self.schema.rules {
            if let Some(message) = evaluate_rule(*rule, &plan) {
                warn!(rule_id = rule.rule_id(), %message, "plan rule failed");
                failures.push(failure(rule.rule_id(), message));
            }
        }

        (failures, Some(plan))
    }
}

impl Default for PlanVerifier {
    /// The strict plan schema with every semantic rule.
    fn default() -> Self {
        Self::new(default_plan_schema())
    }
}

/// Parse an untrusted payload with the default verifier.
pub fn parse_plan(payload: &Value) -> SentinelResult<AgentPlan> {
    PlanVerifier::default().parse(payload)
}

fn failure(rule_id: &str, message: String) -> VerificationFailure {
    VerificationFailure { rule_id: rule_id.to_string(), message }
}

fn evaluate_rule(rule: PlanRule, plan: &AgentPlan) -> Option<String> {
    match rule {
        PlanRule::NonEmptySteps => plan
            .steps
            .is_empty()
            .then(|| "plan has no steps".to_string()),

        PlanRule::NonEmptyToolArguments => plan
            .tool_calls()
            .find(|c| c.arguments.is_empty())
            .map(|c| format!("tool call '{}' has an empty arguments object", c.tool_name)),

        PlanRule::PurchaseRequiresConfirmation => {
            let purchase =
                plan.intent == Intent::Purchase || plan.has_tool(ToolName::ExecutePurchase);
            (purchase && !plan.requires_confirmation)
                .then(|| "purchase plan must set requires_confirmation".to_string())
        }
    }
}

/// Drop every object member whose value is `null`, recursively.
///
/// Strict generators emit `null` for absent optional members; the typed plan
/// treats those as missing.
pub fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}
