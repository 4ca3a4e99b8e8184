//! Offline evaluation harness.
//!
//! Runs a JSONL file of single-turn cases against a freshly seeded shop, once
//! per planner mode, and checks each reply against a coarse expectation.
//! Cases sharing a `session_id` run in file order, so multi-turn flows can be
//! expressed as consecutive lines.
//!
//! ```text
//! {"case_id": "balance", "session_id": "s1", "user_id": "<REAL_USER_ID>",
//!  "message": "what is my balance", "expect": {"type": "balance"}}
//! ```
//!
//! `<REAL_USER_ID>` is replaced by the first seeded user and `<PRODUCT_ID>`
//! by the first seeded product. A case with a `mode` only runs in that mode.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use sentinel_contracts::{
    chat::ChatResponse,
    error::{SentinelError, SentinelResult},
};
use sentinel_core::OrchestratorConfig;
use sentinel_planner::{build_planner, PlannerConfig, PlannerMode};
use sentinel_policy::PolicyLimits;

use crate::{runtime::ReferenceRuntime, seed::seed_with_rng, store::CommerceStore};

/// The cases shipped with the crate.
pub const DEFAULT_CASES: &str = include_str!("../data/eval_cases.jsonl");

pub const USER_PLACEHOLDER: &str = "<REAL_USER_ID>";
pub const PRODUCT_PLACEHOLDER: &str = "<PRODUCT_ID>";

const EVAL_SEED: u64 = 7;
const EVAL_USERS: usize = 3;
const EVAL_PRODUCTS: usize = 8;

static NUMBERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b1[\)\.]\s").expect("valid numbered item regex"));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid digit regex"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Expectation {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    /// Accepts every spelling `PlannerMode` parses, including `llm`.
    #[serde(default, deserialize_with = "planner_mode")]
    pub mode: Option<PlannerMode>,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
    pub expect: Expectation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub case_id: String,
    pub mode: PlannerMode,
    /// False when the runtime returned an error instead of a reply.
    pub completed: bool,
    pub latency_s: f64,
    pub passed: bool,
    pub reason: String,
    pub response_message: String,
    pub needs_confirmation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub results: Vec<CaseResult>,
}

fn planner_mode<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PlannerMode>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// Parse JSONL cases, skipping blank lines.
pub fn parse_cases(text: &str) -> SentinelResult<Vec<EvalCase>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| SentinelError::Config {
                reason: format!("eval case on line {}: {e}", i + 1),
            })
        })
        .collect()
}

/// Whether `response` meets `expect`, with the reason when it does not.
pub fn check_expectation(expect: &Expectation, response: &ChatResponse) -> (bool, String) {
    let msg = response.message.to_lowercase();
    let (passed, failure) = match expect.kind.as_str() {
        "balance" => (
            msg.contains("balance") && DIGIT_RE.is_match(&msg),
            "expected balance-like message".to_string(),
        ),
        "search_list" => (
            NUMBERED_ITEM_RE.is_match(&msg),
            "expected numbered product list (e.g. '1) ...')".to_string(),
        ),
        "confirm_prompt" => (
            response.needs_confirmation || msg.contains("confirm"),
            "expected confirmation prompt".to_string(),
        ),
        "tool_error_absent" => (!msg.contains("tool error"), "saw tool error".to_string()),
        other => (false, format!("unknown expect type: {other}")),
    };
    if passed {
        (true, "ok".to_string())
    } else {
        (false, failure)
    }
}

/// 95th percentile with the exclusive method; the maximum below 20 samples.
pub fn latency_p95(samples: &[f64]) -> f64 {
    if samples.len() < 20 {
        return samples.iter().copied().fold(0.0, f64::max);
    }
    let mut data = samples.to_vec();
    data.sort_by(f64::total_cmp);

    let n = data.len();
    let m = n + 1;
    let j = (19 * m / 20).clamp(1, n - 1);
    let delta = (19 * m - j * 20) as f64;
    (data[j - 1] * (20.0 - delta) + data[j] * delta) / 20.0
}

/// Run `cases` once per entry of `modes`, each over its own seeded shop.
pub fn run_eval(
    cases: &[EvalCase],
    modes: &[PlannerMode],
    planner: &PlannerConfig,
) -> SentinelResult<EvalReport> {
    let mut report = EvalReport::default();

    for &mode in modes {
        let store = Arc::new(CommerceStore::new());
        seed_with_rng(&store, EVAL_USERS, EVAL_PRODUCTS, &mut StdRng::seed_from_u64(EVAL_SEED))?;
        let snapshot = store.snapshot()?;
        let (Some(user), Some(product)) = (snapshot.users.first(), snapshot.products.first())
        else {
            return Err(SentinelError::Config { reason: "eval shop seeded empty".to_string() });
        };
        // Keep purchases of any seeded product within the user's funds.
        store.set_balance(&user.id, Decimal::new(500_000, 2))?;

        let config = PlannerConfig { mode, ..planner.clone() };
        let runtime = ReferenceRuntime::new(
            store.clone(),
            build_planner(&config),
            PolicyLimits::default(),
            OrchestratorConfig::default(),
        );

        for case in cases.iter().filter(|c| c.mode.is_none_or(|m| m == mode)) {
            let user_id = case
                .user_id
                .as_deref()
                .map(|u| if u == USER_PLACEHOLDER { user.id.as_str() } else { u });
            let message = case.message.replace(PRODUCT_PLACEHOLDER, &product.id);

            let started = Instant::now();
            let outcome = runtime.chat(&case.session_id, user_id, &message);
            let latency_s = started.elapsed().as_secs_f64();

            let result = match outcome {
                Ok(response) => {
                    let (passed, reason) = check_expectation(&case.expect, &response);
                    CaseResult {
                        case_id: case.case_id.clone(),
                        mode,
                        completed: true,
                        latency_s,
                        passed,
                        reason,
                        response_message: response.message,
                        needs_confirmation: response.needs_confirmation,
                    }
                }
                Err(e) => {
                    warn!(case_id = %case.case_id, error = %e, "eval case errored");
                    CaseResult {
                        case_id: case.case_id.clone(),
                        mode,
                        completed: false,
                        latency_s,
                        passed: false,
                        reason: "runtime_error".to_string(),
                        response_message: e.to_string(),
                        needs_confirmation: false,
                    }
                }
            };
            report.results.push(result);
        }
    }

    info!(total = report.total(), passed = report.passed(), "eval finished");
    Ok(report)
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passed() as f64 / self.total() as f64
        }
    }

    /// p95 over cases that produced a reply.
    pub fn latency_p95(&self) -> f64 {
        let samples: Vec<f64> =
            self.results.iter().filter(|r| r.completed).map(|r| r.latency_s).collect();
        latency_p95(&samples)
    }

    /// `(passed, total)` per mode.
    pub fn by_mode(&self) -> BTreeMap<String, (usize, usize)> {
        let mut modes = BTreeMap::new();
        for r in &self.results {
            let entry = modes.entry(r.mode.to_string()).or_insert((0, 0));
            entry.0 += usize::from(r.passed);
            entry.1 += 1;
        }
        modes
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// The plain-text summary printed by the demo.
    pub fn render(&self) -> String {
        let mut out = vec![
            "=== Eval Summary ===".to_string(),
            format!(
                "Total: {} | Passed: {} | Pass rate: {:.2}%",
                self.total(),
                self.passed(),
                self.pass_rate() * 100.0
            ),
            format!("Latency p95: {:.3}s", self.latency_p95()),
        ];
        for (mode, (passed, total)) in self.by_mode() {
            out.push(format!("- {mode}: {passed}/{total} ({:.2}%)", percent(passed, total)));
        }
        out.push(String::new());
        out.push("=== Failures ===".to_string());
        for r in self.failures() {
            let excerpt: String = r.response_message.chars().take(120).collect();
            out.push(format!("[{}][{}] {} | msg={excerpt:?}", r.case_id, r.mode, r.reason));
        }
        out.join("\n")
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
