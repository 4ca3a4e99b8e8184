//! The SentinelFlow orchestrator: the per-turn state machine.
//!
//! Every inbound message is tested against three states in strict order,
//! first match wins:
//!
//!   1. Confirmation reply  `confirm <token>`  → ledger → policy → consume → execute
//!   2. Selection reply     `2`, `second`, …   → candidate → new ledger entry
//!   3. Planned flow                            → plan → ask / policy → tools
//!
//! Purchases only ever execute on path 1, and only after the ledger entry has
//! been consumed. The token is consumed before execution, so a failed
//! purchase cannot be retried with the same token.

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use sentinel_contracts::{
    chat::{ChatRequest, ChatResponse},
    commerce::ProductCandidate,
    error::SentinelResult,
    ledger::{LedgerEntry, LedgerState, PendingConfirmation},
    plan::{AgentPlan, Intent, PlanStep, RiskLevel, ToolCall, ToolName},
    policy::PolicyDecision,
    session::SessionMemory,
    tool_io::SearchProductsOut,
    trace::Trace,
};

use crate::{
    config::OrchestratorConfig,
    ids::{new_confirmation_token, new_idempotency_key},
    registry::{ToolOutcome, ToolRegistry},
    resolver::{is_cancel, parse_selection_index},
    traits::{ConfirmationLedger, PlanGenerator, PolicyEngine, SessionStore, TraceStore},
};

pub const INVALID_TOKEN: &str = "Invalid or expired confirmation token.";
pub const TOKEN_ALREADY_USED: &str = "This confirmation token has already been used.";
pub const MISSING_IDENTITY: &str = "Missing user_id. Cannot confirm purchase.";
pub const CANCELED: &str = "Okay, canceled. What would you like to do next?";
pub const NO_MATCHES: &str = "I couldn't find any matching products. Try a more specific keyword.";
pub const DONE: &str = "Done.";

const PURCHASE_KEYWORDS: [&str; 3] = ["buy", "purchase", "order"];
const MAX_QUERY_CHARS: usize = 120;

/// The persistence seams the orchestrator writes through.
pub struct Stores {
    pub traces: std::sync::Arc<dyn TraceStore>,
    pub sessions: std::sync::Arc<dyn SessionStore>,
    pub ledger: std::sync::Arc<dyn ConfirmationLedger>,
}

/// Drives one user turn from message to response.
///
/// The planner is fixed at construction. Switching between the rule planner
/// and the oracle means building a new orchestrator.
pub struct Orchestrator {
    planner: Box<dyn PlanGenerator>,
    policy: Box<dyn PolicyEngine>,
    registry: ToolRegistry,
    stores: Stores,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        planner: Box<dyn PlanGenerator>,
        policy: Box<dyn PolicyEngine>,
        registry: ToolRegistry,
        stores: Stores,
        config: OrchestratorConfig,
    ) -> Self {
        Self { planner, policy, registry, stores, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Handle one inbound message.
    ///
    /// Policy denials, unknown tokens, and tool failures are answered in the
    /// response text. `Err` means a store or the audit trail failed.
    pub fn handle_message(&self, request: &ChatRequest) -> SentinelResult<ChatResponse> {
        debug!(
            session_id = %request.session_id,
            has_identity = request.identity().is_some(),
            "handling message"
        );

        if let Some(token) = parse_confirm_reply(&request.message) {
            return self.handle_confirmation(request, token);
        }

        if let Some(response) = self.try_selection(request)? {
            return Ok(response);
        }

        self.handle_planned(request)
    }

    // ── State 1: confirmation reply ──────────────────────────────────────────

    fn handle_confirmation(&self, request: &ChatRequest, token: &str) -> SentinelResult<ChatResponse> {
        let session_id = request.session_id.as_str();

        // Looked up before this turn's trace exists, so the window counts
        // only earlier turns.
        let entry = self.find_in_window(session_id, token)?;
        let trace = self.stores.traces.create(session_id, &request.message)?;

        let Some(entry) = entry else {
            info!(trace_id = %trace.id, session_id = %session_id, "confirmation token not found");
            return self.finish(&trace, INVALID_TOKEN.to_string(), None, None);
        };

        if entry.state == LedgerState::Consumed {
            info!(trace_id = %trace.id, "confirmation token replayed");
            return self.finish(&trace, TOKEN_ALREADY_USED.to_string(), None, None);
        }

        let Some(user_id) = request.identity() else {
            warn!(trace_id = %trace.id, "confirmation without identity");
            return self.finish(&trace, MISSING_IDENTITY.to_string(), None, None);
        };

        let tool = entry.pending.tool_name;
        let mut args = entry.pending.tool_args.clone();
        // The current turn's identity always wins over the stored one.
        args.insert("user_id".to_string(), json!(user_id));
        args.insert("confirm".to_string(), json!(true));

        // Balances and stock may have moved since the token was issued, and
        // selection-path tokens were never checked against the ceiling.
        let recheck = AgentPlan {
            intent: Intent::Purchase,
            steps: vec![PlanStep::ToolCall(ToolCall::new(tool, args.clone()))],
            requires_confirmation: true,
            confirmation_summary: None,
            risk_level: RiskLevel::High,
        };
        let decision = self.policy.evaluate(&recheck, Some(user_id))?;
        if !decision.allowed {
            info!(trace_id = %trace.id, reason = ?decision.reason, "confirmation denied by policy");
            return self.finish(&trace, denial_message(&decision), None, None);
        }

        if self.stores.ledger.consume(token)?.is_none() {
            info!(trace_id = %trace.id, "confirmation token consumed concurrently");
            return self.finish(&trace, TOKEN_ALREADY_USED.to_string(), None, None);
        }

        info!(trace_id = %trace.id, tool = %tool, "executing confirmed action");
        let outcome = self.registry.run_with_audit(&trace.id, tool, &args)?;
        if !outcome.is_ok() {
            let message = format!("Purchase failed: {}", outcome.error_text());
            return self.finish(&trace, message, None, None);
        }

        let output = outcome.output.unwrap_or(Value::Null);
        let currency = text_field(&output, "currency");
        let message = format!(
            "Purchase confirmed.\nTransaction: {}\nTotal: {} {currency}\nRemaining balance: {} {currency}",
            text_field(&output, "transaction_id"),
            text_field(&output, "total_amount"),
            text_field(&output, "remaining_balance"),
        );
        self.finish(&trace, message, None, None)
    }

    /// The ledger entry for `token`, if its owning trace is still among the
    /// session's `ledger_window` most recent traces.
    fn find_in_window(&self, session_id: &str, token: &str) -> SentinelResult<Option<LedgerEntry>> {
        let Some(entry) = self.stores.ledger.find(session_id, token)? else {
            return Ok(None);
        };
        let recent = self.stores.traces.recent(session_id, self.config.ledger_window)?;
        if recent.iter().any(|t| t.id == entry.trace_id) {
            Ok(Some(entry))
        } else {
            debug!(session_id = %session_id, "confirmation token outside the ledger window");
            Ok(None)
        }
    }

    // ── State 2: selection reply ─────────────────────────────────────────────

    fn try_selection(&self, request: &ChatRequest) -> SentinelResult<Option<ChatResponse>> {
        let session_id = request.session_id.as_str();

        if is_cancel(&request.message) {
            let mut memory = self.stores.sessions.load(session_id)?;
            memory.clear_selection();
            self.stores.sessions.save(session_id, &memory)?;

            let trace = self.stores.traces.create(session_id, &request.message)?;
            info!(trace_id = %trace.id, "selection canceled");
            return self.finish(&trace, CANCELED.to_string(), None, None).map(Some);
        }

        let Some(index) = parse_selection_index(&request.message) else {
            return Ok(None);
        };
        let mut memory = self.stores.sessions.load(session_id)?;
        if memory.candidates.is_empty() {
            return Ok(None);
        }

        let trace = self.stores.traces.create(session_id, &request.message)?;
        let count = memory.candidates.len();
        if index < 1 || index > count {
            let message =
                format!("That option number is out of range (1-{count}). Please try again.");
            return self.finish(&trace, message, None, None).map(Some);
        }

        let chosen = memory.candidates[index - 1].clone();
        let qty = memory.pending_qty.unwrap_or(self.config.default_qty);
        memory.selected_product_id = Some(chosen.id.clone());
        self.stores.sessions.save(session_id, &memory)?;

        let mut args = Map::new();
        if let Some(user_id) = request.identity() {
            args.insert("user_id".to_string(), json!(user_id));
        }
        args.insert("product_id".to_string(), json!(chosen.id));
        args.insert("qty".to_string(), json!(qty));
        args.insert("idempotency_key".to_string(), json!(new_idempotency_key()));
        args.insert("confirm".to_string(), json!(true));

        let pending = PendingConfirmation {
            token: new_confirmation_token(),
            tool_name: ToolName::ExecutePurchase,
            tool_args: args,
        };
        self.stores.ledger.issue(session_id, &trace.id, pending.clone())?;
        info!(trace_id = %trace.id, product_id = %chosen.id, qty, "candidate selected");

        let message = format!(
            "Confirm purchase:\n- Product: {}\n- Qty: {qty}\n\nReply with: confirm {}\n(or say cancel)",
            chosen.name, pending.token,
        );
        self.finish(&trace, message, None, Some(pending)).map(Some)
    }

    // ── State 3: planned flow ────────────────────────────────────────────────

    fn handle_planned(&self, request: &ChatRequest) -> SentinelResult<ChatResponse> {
        let session_id = request.session_id.as_str();
        let user_id = request.identity();
        let trace = self.stores.traces.create(session_id, &request.message)?;
        let mut memory = self.stores.sessions.load(session_id)?;

        let planning_message = rewrite_with_selection(&request.message, &memory, self.config.default_qty);
        let mut plan = self.planner.generate(&planning_message, user_id);

        if needs_product_search(&plan, &planning_message) {
            debug!(trace_id = %trace.id, "purchase intent without product id, forcing search");
            plan = forced_search_plan(plan, &request.message, self.config.search_limit);
        }

        debug!(
            trace_id = %trace.id,
            intent = ?plan.intent,
            steps = plan.steps.len(),
            "plan generated"
        );

        if let Some(question) = plan.first_ask_user() {
            let asks_to_pick = asks_to_pick_option(question);
            if asks_to_pick
                && (memory.candidates.is_empty() || plan.has_tool(ToolName::SearchProducts))
            {
                let args = plan
                    .tool_calls()
                    .find(|c| c.tool_name == ToolName::SearchProducts)
                    .map(|c| c.arguments.clone())
                    .unwrap_or_default();
                return self.run_search(&trace, &plan, &mut memory, args, &request.message);
            }
            let question = question.to_string();
            return self.finish(&trace, question, Some(&plan), None);
        }

        let decision = self.policy.evaluate(&plan, user_id)?;
        if !decision.allowed {
            info!(trace_id = %trace.id, reason = ?decision.reason, "plan denied by policy");
            return self.finish(&trace, denial_message(&decision), Some(&plan), None);
        }

        for step in &plan.steps {
            let call = match step {
                PlanStep::ToolCall(call) => call,
                PlanStep::AskUser { .. } => continue,
                PlanStep::Done => break,
            };

            let mut args = call.arguments.clone();
            if call.tool_name.requires_identity() {
                if let Some(user_id) = user_id {
                    args.insert("user_id".to_string(), json!(user_id));
                }
            }

            match call.tool_name {
                ToolName::SearchProducts => {
                    return self.run_search(&trace, &plan, &mut memory, args, &request.message);
                }

                ToolName::ExecutePurchase => {
                    let has_key = args
                        .get("idempotency_key")
                        .and_then(Value::as_str)
                        .is_some_and(|k| !k.is_empty());
                    if !has_key {
                        args.insert("idempotency_key".to_string(), json!(new_idempotency_key()));
                    }

                    if decision.needs_confirmation {
                        args.insert("confirm".to_string(), json!(true));
                        let pending = PendingConfirmation {
                            token: new_confirmation_token(),
                            tool_name: ToolName::ExecutePurchase,
                            tool_args: args,
                        };
                        self.stores.ledger.issue(session_id, &trace.id, pending.clone())?;
                        info!(trace_id = %trace.id, "purchase awaiting confirmation");

                        let summary = decision
                            .confirmation_summary
                            .clone()
                            .unwrap_or_else(|| "Please confirm this purchase.".to_string());
                        let message = format!("{summary}\n\nReply with: confirm {}", pending.token);
                        return self.finish(&trace, message, Some(&plan), Some(pending));
                    }

                    // Never reached with the purchase policy in place; the
                    // handler blocks an unconfirmed purchase on its own.
                    args.insert("confirm".to_string(), json!(false));
                    let outcome = self.registry.run_with_audit(&trace.id, call.tool_name, &args)?;
                    if !outcome.is_ok() {
                        return self.finish(&trace, tool_error(&outcome), Some(&plan), None);
                    }
                }

                ToolName::CheckBalance => {
                    let outcome = self.registry.run_with_audit(&trace.id, call.tool_name, &args)?;
                    let message = match &outcome.output {
                        Some(out) if outcome.is_ok() => format!(
                            "Your balance is {} {}.",
                            text_field(out, "balance"),
                            text_field(out, "currency")
                        ),
                        _ => tool_error(&outcome),
                    };
                    return self.finish(&trace, message, Some(&plan), None);
                }

                ToolName::UpdateDatabase => {
                    let outcome = self.registry.run_with_audit(&trace.id, call.tool_name, &args)?;
                    let message = match &outcome.output {
                        Some(out) if outcome.is_ok() => {
                            format!("Update recorded: {}", text_field(out, "status"))
                        }
                        _ => tool_error(&outcome),
                    };
                    return self.finish(&trace, message, Some(&plan), None);
                }
            }
        }

        self.finish(&trace, DONE.to_string(), Some(&plan), None)
    }

    /// Run a product search and show the results as numbered candidates.
    fn run_search(
        &self,
        trace: &Trace,
        plan: &AgentPlan,
        memory: &mut SessionMemory,
        mut args: Map<String, Value>,
        message: &str,
    ) -> SentinelResult<ChatResponse> {
        let has_query = args
            .get("query")
            .and_then(Value::as_str)
            .is_some_and(|q| !q.trim().is_empty());
        if !has_query {
            args.insert("query".to_string(), json!(repair_query(message)));
        }
        args.entry("limit").or_insert_with(|| json!(self.config.search_limit));

        let outcome = self.registry.run_with_audit(&trace.id, ToolName::SearchProducts, &args)?;
        if !outcome.is_ok() {
            return self.finish(trace, tool_error(&outcome), Some(plan), None);
        }

        let candidates = outcome
            .output
            .and_then(|out| serde_json::from_value::<SearchProductsOut>(out).ok())
            .map(|out| out.results)
            .unwrap_or_default();

        if candidates.is_empty() {
            return self.finish(trace, NO_MATCHES.to_string(), Some(plan), None);
        }

        memory.candidates = candidates;
        memory.selected_product_id = None;
        memory.pending_qty = Some(memory.pending_qty.unwrap_or(self.config.default_qty));
        self.stores.sessions.save(&trace.session_id, memory)?;

        debug!(trace_id = %trace.id, count = memory.candidates.len(), "candidates stored");
        self.finish(trace, format_candidates(&memory.candidates), Some(plan), None)
    }

    /// Write the single late update of `trace` and build the response.
    fn finish(
        &self,
        trace: &Trace,
        message: String,
        plan: Option<&AgentPlan>,
        pending: Option<PendingConfirmation>,
    ) -> SentinelResult<ChatResponse> {
        self.stores
            .traces
            .update(&trace.id, &message, plan, pending.as_ref())?;

        Ok(ChatResponse {
            trace_id: trace.id.clone(),
            session_id: trace.session_id.clone(),
            message,
            needs_confirmation: pending.is_some(),
            confirmation_token: pending.map(|p| p.token),
        })
    }
}

// ── Message helpers ──────────────────────────────────────────────────────────

/// The token of a `confirm <token>` reply. Exactly two words; the keyword is
/// case-insensitive, the token is not.
pub fn parse_confirm_reply(message: &str) -> Option<&str> {
    let mut parts = message.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(keyword), Some(token), None) if keyword.eq_ignore_ascii_case("confirm") => Some(token),
        _ => None,
    }
}

fn expresses_purchase(message: &str) -> bool {
    let lower = message.to_lowercase();
    PURCHASE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// With a product already selected, "buy it" becomes an explicit purchase
/// the planner can act on.
pub fn rewrite_with_selection(message: &str, memory: &SessionMemory, default_qty: u32) -> String {
    match &memory.selected_product_id {
        Some(product_id)
            if expresses_purchase(message) && !message.to_lowercase().contains("product_id=") =>
        {
            let qty = memory.pending_qty.unwrap_or(default_qty);
            format!("buy product_id={product_id} qty={qty}")
        }
        _ => message.to_string(),
    }
}

/// Purchase intent with neither a search step nor a purchase call naming a
/// product.
pub fn needs_product_search(plan: &AgentPlan, message: &str) -> bool {
    if !expresses_purchase(message) || plan.has_tool(ToolName::SearchProducts) {
        return false;
    }
    let names_product = plan
        .tool_calls()
        .filter(|c| c.tool_name == ToolName::ExecutePurchase)
        .any(|c| c.str_arg("product_id").is_some());
    !names_product
}

/// The question asked after a forced search showing up to `limit` results.
pub fn pick_option_prompt(limit: u32) -> String {
    format!("Pick an option number (1-{limit}) from the results.")
}

/// Replace `plan`'s steps with `[search, ask]`, keeping its summary and risk.
pub fn forced_search_plan(plan: AgentPlan, message: &str, limit: u32) -> AgentPlan {
    let query: String = message.trim().chars().take(MAX_QUERY_CHARS).collect();
    let mut args = Map::new();
    args.insert("query".to_string(), json!(query));
    args.insert("limit".to_string(), json!(limit));

    AgentPlan {
        intent: plan.intent,
        steps: vec![
            PlanStep::tool(ToolName::SearchProducts, args),
            PlanStep::ask(pick_option_prompt(limit)),
        ],
        requires_confirmation: true,
        confirmation_summary: plan.confirmation_summary,
        risk_level: plan.risk_level,
    }
}

fn asks_to_pick_option(question: &str) -> bool {
    let lower = question.to_lowercase();
    lower.contains("option") || lower.contains("(1-") || lower.contains("(1–")
}

/// Turn a chatty purchase request into a search query.
pub fn repair_query(message: &str) -> String {
    const FILLER_PHRASES: [&str; 7] =
        ["buy", "purchase", "order", "please", "can you", "i want to", "i want"];
    const FILLER_WORDS: [&str; 9] = ["me", "a", "an", "the", "to", "for", "of", "some", "one"];

    let mut raw = message.to_lowercase();
    for phrase in FILLER_PHRASES {
        raw = raw.replace(phrase, " ");
    }
    let kept: Vec<&str> = raw
        .split_whitespace()
        .filter(|t| !FILLER_WORDS.contains(t))
        .collect();

    let query = if !kept.is_empty() {
        kept.join(" ")
    } else if !raw.trim().is_empty() {
        raw.trim().to_string()
    } else {
        message.trim().to_string()
    };
    query.chars().take(MAX_QUERY_CHARS).collect()
}

pub fn format_candidates(candidates: &[ProductCandidate]) -> String {
    let mut lines = vec!["Here are matching products:".to_string()];
    for (i, p) in candidates.iter().enumerate() {
        lines.push(format!(
            "{}) {} - {} {} (stock: {})",
            i + 1,
            p.name,
            p.price,
            p.currency,
            p.inventory_qty
        ));
    }
    lines.push(String::new());
    lines.push("Reply with the option number (e.g., `2`) or say `cancel`.".to_string());
    lines.join("\n")
}

fn denial_message(decision: &PolicyDecision) -> String {
    match decision.reason {
        Some(reason) => format!("Cannot proceed: {reason}."),
        None => "Cannot proceed.".to_string(),
    }
}

fn tool_error(outcome: &ToolOutcome) -> String {
    format!("Tool error ({}): {}", outcome.tool, outcome.error_text())
}

/// A JSON field as display text; strings are shown without quotes.
fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
