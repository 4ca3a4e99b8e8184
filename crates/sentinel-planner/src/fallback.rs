//! Oracle-backed plan generation with total-failure fallback.
//!
//! `OraclePlanner` is the only place oracle failures are handled. Any error
//! along the way (transport, refusal, unparseable text, schema or plan-rule
//! violation) is logged and answered with the rule planner's plan instead.
//! Callers only ever see a valid plan.

use serde_json::{json, Value};
use tracing::{debug, warn};

use sentinel_contracts::{error::SentinelResult, plan::AgentPlan, plan::PlanStep};
use sentinel_core::traits::PlanGenerator;
use sentinel_verify::PlanVerifier;

use crate::{
    oracle::{extract_json_object, PlanOracle},
    prompt::{build_instructions, SYSTEM_PROMPT},
    rules::RulePlanner,
};

pub struct OraclePlanner {
    oracle: Box<dyn PlanOracle>,
    verifier: PlanVerifier,
    fallback: RulePlanner,
    schema: Value,
}

impl OraclePlanner {
    pub fn new(oracle: Box<dyn PlanOracle>) -> Self {
        let verifier = PlanVerifier::default();
        let schema = verifier.schema().json_schema.clone();
        Self { oracle, verifier, fallback: RulePlanner::new(), schema }
    }

    /// One oracle round trip, verified. Errors are not absorbed here.
    pub fn try_generate(&self, message: &str, user_id: Option<&str>) -> SentinelResult<AgentPlan> {
        let instructions = build_instructions(message, user_id);
        let raw = self.oracle.complete(SYSTEM_PROMPT, &instructions, &self.schema)?;
        let payload = extract_json_object(&raw)?;
        let mut plan = self.verifier.parse(&payload)?;
        if let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) {
            inject_identity(&mut plan, user_id);
        }
        Ok(plan)
    }
}

impl PlanGenerator for OraclePlanner {
    fn generate(&self, message: &str, user_id: Option<&str>) -> AgentPlan {
        match self.try_generate(message, user_id) {
            Ok(plan) => {
                debug!(intent = ?plan.intent, steps = plan.steps.len(), "oracle plan accepted");
                plan
            }
            Err(e) => {
                warn!(error = %e, "plan oracle failed; falling back to rule planner");
                self.fallback.generate(message, user_id)
            }
        }
    }
}

/// Set `user_id` on every tool call that acts for a user.
fn inject_identity(plan: &mut AgentPlan, user_id: &str) {
    for step in &mut plan.steps {
        if let PlanStep::ToolCall(call) = step {
            if call.tool_name.requires_identity() {
                call.arguments.insert("user_id".to_string(), json!(user_id));
            }
        }
    }
}
