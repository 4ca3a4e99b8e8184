//! # sentinel-verify
//!
//! Plan verification for the SentinelFlow runtime.
//!
//! Plans produced by an external generator are untrusted. This crate owns
//! the plan JSON Schema, the strict-mode rewrite of that schema handed to
//! structured-output generators, and [`engine::PlanVerifier`], which turns a
//! raw payload into an `AgentPlan` only if it passes:
//!
//! 1. **Structural** checks against the strict JSON Schema (`jsonschema`).
//! 2. **Shape** checks: exactly one payload per step.
//! 3. **Semantic** plan rules (`PurchaseRequiresConfirmation`,
//!    `NonEmptyToolArguments`, `NonEmptySteps`).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use sentinel_verify::{parse_plan, strict_plan_schema};
//!
//! let schema = strict_plan_schema(); // send with the generator request
//! let plan = parse_plan(&payload)?;  // reject anything else
//! ```

pub mod engine;
pub mod schema;

pub use engine::{parse_plan, strip_nulls, PlanVerifier};
pub use schema::{default_plan_schema, plan_json_schema, strict_plan_schema, strictify};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use sentinel_contracts::{
        error::SentinelError,
        plan::{Intent, PlanStep, ToolName},
        verify::{PlanRule, PlanSchema},
    };

    use super::{parse_plan, plan_json_schema, PlanVerifier};

    // ── Builder helpers ───────────────────────────────────────────────────────

    /// Every argument member a strict generator emits, all null.
    fn null_args() -> Value {
        json!({
            "user_id": null, "product_id": null, "qty": null, "query": null,
            "limit": null, "table": null, "key": null, "value": null
        })
    }

    fn args(set: Value) -> Value {
        let mut all = null_args();
        for (k, v) in set.as_object().unwrap() {
            all[k] = v.clone();
        }
        all
    }

    fn tool_step(tool: &str, arguments: Value) -> Value {
        json!({
            "step_type": "tool_call",
            "tool_call": { "tool_name": tool, "arguments": arguments },
            "user_message": null
        })
    }

    fn ask_step(message: &str) -> Value {
        json!({ "step_type": "ask_user", "tool_call": null, "user_message": message })
    }

    fn plan(intent: &str, steps: Vec<Value>, requires_confirmation: bool) -> Value {
        json!({
            "intent": intent,
            "steps": steps,
            "requires_confirmation": requires_confirmation,
            "confirmation_summary": null,
            "risk_level": null
        })
    }

    // ── Passing payloads ──────────────────────────────────────────────────────

    #[test]
    fn test_search_then_ask_plan_parses() {
        let payload = plan(
            "purchase",
            vec![
                tool_step("search_products", args(json!({ "query": "keyboard", "limit": 5 }))),
                ask_step("Pick an option number (1-5) from the results."),
            ],
            true,
        );

        let plan = parse_plan(&payload).unwrap();

        assert_eq!(plan.intent, Intent::Purchase);
        assert!(plan.requires_confirmation);
        let search = plan.steps[0].as_tool_call().unwrap();
        assert_eq!(search.tool_name, ToolName::SearchProducts);
        assert_eq!(search.arguments.len(), 2, "null members must be stripped");
        assert_eq!(search.str_arg("query"), Some("keyboard"));
        assert_eq!(plan.steps[1], PlanStep::ask("Pick an option number (1-5) from the results."));
    }

    #[test]
    fn test_null_top_level_members_take_defaults() {
        let mut payload = plan(
            "check_balance",
            vec![tool_step("check_balance", args(json!({ "user_id": "u-1" })))],
            false,
        );
        payload["intent"] = Value::Null;

        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.intent, Intent::Unknown);
        assert_eq!(plan.risk_level, Default::default());
    }

    #[test]
    fn test_verify_passes_clean_report() {
        let payload = plan("unknown", vec![ask_step("What would you like to do?")], false);
        let report = PlanVerifier::default().verify(&payload);
        assert!(report.passed, "failures: {:?}", report.failures);
        assert!(report.summary().is_empty());
    }

    // ── Structural failures ───────────────────────────────────────────────────

    #[test]
    fn test_unknown_tool_is_a_schema_violation() {
        let payload = plan("unknown", vec![tool_step("drop_tables", args(json!({ "key": "x" })))], false);

        match parse_plan(&payload) {
            Err(SentinelError::SchemaValidation { reason }) => {
                assert!(reason.contains("[json-schema]"), "got: {reason}");
            }
            other => panic!("expected SchemaValidation, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_and_missing_members_are_rejected() {
        let mut extra = plan("unknown", vec![ask_step("hi")], false);
        extra["notes"] = json!("free text");
        assert!(matches!(parse_plan(&extra), Err(SentinelError::SchemaValidation { .. })));

        let missing = json!({ "intent": "unknown", "steps": [] });
        let report = PlanVerifier::default().verify(&missing);
        assert!(!report.passed);
        assert!(report.failures.iter().all(|f| f.rule_id == "json-schema"));

        assert!(matches!(parse_plan(&json!("not a plan")), Err(SentinelError::SchemaValidation { .. })));
    }

    // ── Shape failures ────────────────────────────────────────────────────────

    #[test]
    fn test_ask_user_without_message_is_rejected() {
        let payload = plan("unknown", vec![ask_step("  ")], false);

        match parse_plan(&payload) {
            Err(SentinelError::PlanRejected { reason }) => {
                assert!(reason.contains("[plan-shape]"), "got: {reason}");
            }
            other => panic!("expected PlanRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_call_step_with_message_is_rejected() {
        let mut step = tool_step("check_balance", args(json!({ "user_id": "u-1" })));
        step["user_message"] = json!("and also say hi");
        let payload = plan("check_balance", vec![step], false);
        assert!(matches!(parse_plan(&payload), Err(SentinelError::PlanRejected { .. })));
    }

    // ── Semantic rules ────────────────────────────────────────────────────────

    #[test]
    fn test_purchase_without_confirmation_is_rejected() {
        let payload = plan(
            "purchase",
            vec![tool_step(
                "execute_purchase",
                args(json!({ "user_id": "u-1", "product_id": "p-1", "qty": 1 })),
            )],
            false,
        );

        let report = PlanVerifier::default().verify(&payload);
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].rule_id, PlanRule::PurchaseRequiresConfirmation.rule_id());

        assert!(matches!(parse_plan(&payload), Err(SentinelError::PlanRejected { .. })));
    }

    #[test]
    fn test_all_semantic_failures_are_collected() {
        let payload = plan(
            "unknown",
            vec![tool_step("execute_purchase", null_args())],
            false,
        );

        let report = PlanVerifier::default().verify(&payload);
        let ids: Vec<&str> = report.failures.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["non-empty-tool-arguments", "purchase-requires-confirmation"]);
    }

    #[test]
    fn test_empty_steps_rejected() {
        let report = PlanVerifier::default().verify(&plan("unknown", vec![], false));
        assert_eq!(report.failures[0].rule_id, "non-empty-steps");
    }

    // ── Custom schemas ────────────────────────────────────────────────────────

    #[test]
    fn test_lenient_schema_accepts_sparse_payloads() {
        let verifier = PlanVerifier::new(PlanSchema {
            schema_id: "agent-plan-v1".to_string(),
            json_schema: plan_json_schema(),
            rules: vec![PlanRule::NonEmptySteps],
        });
        let payload = json!({ "steps": [{ "step_type": "done" }] });

        let plan = verifier.parse(&payload).unwrap();
        assert_eq!(plan.steps, vec![PlanStep::Done]);
    }

    #[test]
    fn test_invalid_schema_document_is_a_failure() {
        let verifier = PlanVerifier::new(PlanSchema {
            schema_id: "broken".to_string(),
            json_schema: json!({ "type": 12 }),
            rules: vec![],
        });
        let report = verifier.verify(&json!({}));
        assert!(!report.passed);
        assert!(report.failures[0].message.contains("invalid JSON Schema document"));
    }
}
