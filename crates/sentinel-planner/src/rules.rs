//! Deterministic keyword planner.
//!
//! Used on its own in `rules` mode and as the fallback for every oracle
//! failure. It never guesses: a missing user id or product id becomes a
//! single `ask_user` step.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use sentinel_contracts::plan::{AgentPlan, Intent, PlanStep, RiskLevel, ToolName};
use sentinel_core::traits::PlanGenerator;

pub const ASK_USER_ID: &str = "What is your user_id?";
pub const ASK_PRODUCT_ID: &str = "Please provide product_id (e.g., 'buy product_id=<id> qty=1').";
pub const ASK_WHAT_TO_DO: &str =
    "I can help with balance checks or purchases. What would you like to do?";

const BALANCE_KEYWORDS: [&str; 3] = ["balance", "how much do i have", "my funds"];
const PURCHASE_KEYWORDS: [&str; 3] = ["buy", "purchase", "order"];

static PRODUCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"product_id\s*=\s*([a-f0-9\-]{8,})").expect("valid product_id regex")
});
static QTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"qty\s*=\s*(\d+)").expect("valid qty regex"));

/// Keyword-matching `PlanGenerator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulePlanner;

impl RulePlanner {
    pub fn new() -> Self {
        Self
    }
}

impl PlanGenerator for RulePlanner {
    fn generate(&self, message: &str, user_id: Option<&str>) -> AgentPlan {
        let msg = message.trim().to_lowercase();
        let user_id = user_id.filter(|u| !u.trim().is_empty());

        let plan = if BALANCE_KEYWORDS.iter().any(|k| msg.contains(k)) {
            balance_plan(user_id)
        } else if PURCHASE_KEYWORDS.iter().any(|k| msg.contains(k)) {
            purchase_plan(&msg, user_id)
        } else {
            AgentPlan::ask(Intent::Unknown, ASK_WHAT_TO_DO)
        };

        debug!(intent = ?plan.intent, steps = plan.steps.len(), "rule plan generated");
        plan
    }
}

fn balance_plan(user_id: Option<&str>) -> AgentPlan {
    let Some(user_id) = user_id else {
        return AgentPlan::ask(Intent::CheckBalance, ASK_USER_ID);
    };
    AgentPlan {
        intent: Intent::CheckBalance,
        steps: vec![
            PlanStep::tool(ToolName::CheckBalance, args([("user_id", json!(user_id))])),
            PlanStep::Done,
        ],
        ..AgentPlan::default()
    }
}

fn purchase_plan(msg: &str, user_id: Option<&str>) -> AgentPlan {
    let product_id = PRODUCT_ID_RE
        .captures(msg)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    // A quantity too large for u64 is passed through as text so policy
    // rejects it instead of it silently becoming 1.
    let qty = match QTY_RE.captures(msg).and_then(|c| c.get(1)) {
        None => json!(1),
        Some(m) => match m.as_str().parse::<u64>() {
            Ok(n) => json!(n),
            Err(_) => json!(m.as_str()),
        },
    };

    let steps = match (user_id, product_id) {
        (None, _) => vec![PlanStep::ask(ASK_USER_ID)],
        (Some(_), None) => vec![PlanStep::ask(ASK_PRODUCT_ID)],
        (Some(user_id), Some(product_id)) => vec![
            PlanStep::tool(
                ToolName::ExecutePurchase,
                args([
                    ("user_id", json!(user_id)),
                    ("product_id", json!(product_id)),
                    ("qty", qty),
                ]),
            ),
            PlanStep::Done,
        ],
    };

    AgentPlan {
        intent: Intent::Purchase,
        steps,
        requires_confirmation: true,
        confirmation_summary: None,
        risk_level: RiskLevel::High,
    }
}

fn args<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PRODUCT: &str = "3f2a9c1e-0b7d-4e5f-9a21-77c0d4e8b123";

    #[test]
    fn test_balance_with_and_without_identity() {
        let plan = RulePlanner.generate("What is my balance?", Some("u-1"));
        assert_eq!(plan.intent, Intent::CheckBalance);
        let call = plan.steps[0].as_tool_call().unwrap();
        assert_eq!(call.tool_name, ToolName::CheckBalance);
        assert_eq!(call.str_arg("user_id"), Some("u-1"));
        assert_eq!(plan.steps[1], PlanStep::Done);

        let plan = RulePlanner.generate("how much do I have", None);
        assert_eq!(plan.first_ask_user(), Some(ASK_USER_ID));
        assert!(plan.tool_calls().next().is_none());
    }

    #[test]
    fn test_purchase_extracts_product_and_qty() {
        let message = format!("Buy product_id={PRODUCT} qty=3");
        let plan = RulePlanner.generate(&message, Some("u-1"));

        assert_eq!(plan.intent, Intent::Purchase);
        assert!(plan.requires_confirmation);
        assert_eq!(plan.risk_level, RiskLevel::High);
        let call = plan.purchase_call().unwrap();
        assert_eq!(call.str_arg("product_id"), Some(PRODUCT));
        assert_eq!(call.arguments["qty"], json!(3));
    }

    #[test]
    fn test_purchase_qty_defaults_to_one() {
        let plan = RulePlanner.generate(&format!("order product_id = {PRODUCT}"), Some("u-1"));
        assert_eq!(plan.purchase_call().unwrap().arguments["qty"], json!(1));
    }

    #[test]
    fn test_purchase_qty_overflow_is_kept() {
        let message = format!("buy product_id={PRODUCT} qty=99999999999999999999");
        let plan = RulePlanner.generate(&message, Some("u-1"));
        let qty = &plan.purchase_call().unwrap().arguments["qty"];
        assert_ne!(qty, &json!(1));
        assert_eq!(qty, &json!("99999999999999999999"));
    }

    #[test]
    fn test_purchase_asks_instead_of_guessing() {
        let plan = RulePlanner.generate("buy a keyboard", Some("u-1"));
        assert_eq!(plan.first_ask_user(), Some(ASK_PRODUCT_ID));
        assert!(plan.requires_confirmation);

        let plan = RulePlanner.generate(&format!("buy product_id={PRODUCT}"), None);
        assert_eq!(plan.first_ask_user(), Some(ASK_USER_ID));
        assert!(plan.purchase_call().is_none());

        let plan = RulePlanner.generate("buy product_id=xyz", Some("u-1"));
        assert_eq!(plan.first_ask_user(), Some(ASK_PRODUCT_ID));
    }

    #[test]
    fn test_balance_keywords_take_precedence() {
        let plan = RulePlanner.generate("check my balance before I buy", Some("u-1"));
        assert_eq!(plan.intent, Intent::CheckBalance);
    }

    #[test]
    fn test_unknown_message() {
        let plan = RulePlanner.generate("hello there", Some("u-1"));
        assert_eq!(plan.intent, Intent::Unknown);
        assert_eq!(plan.first_ask_user(), Some(ASK_WHAT_TO_DO));
        assert!(!plan.requires_confirmation);
    }
}
