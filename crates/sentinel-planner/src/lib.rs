//! # sentinel-planner
//!
//! Plan generation for the SentinelFlow runtime.
//!
//! ## Overview
//!
//! - [`RulePlanner`] is a deterministic keyword planner.
//! - [`OraclePlanner`] asks an external [`PlanOracle`] for a plan under a
//!   strict JSON Schema, verifies it with `sentinel-verify`, and falls back
//!   to the rule planner on any failure.
//! - [`build_planner`] picks one from a [`PlannerConfig`]. The mode is fixed
//!   for the lifetime of the generator it returns.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use sentinel_planner::{build_planner, PlannerConfig};
//!
//! let planner = build_planner(&PlannerConfig::from_file(Path::new("planner.toml"))?);
//! // Pass `planner` to `sentinel_core::Orchestrator::new(...)`.
//! ```

pub mod config;
pub mod fallback;
pub mod oracle;
pub mod prompt;
pub mod rules;

pub use config::{OracleConfig, PlannerConfig, PlannerMode};
pub use fallback::OraclePlanner;
pub use oracle::{extract_json_object, HttpPlanOracle, PlanOracle};
pub use rules::RulePlanner;

use tracing::{info, warn};

use sentinel_core::traits::PlanGenerator;

/// Build the plan generator `config` asks for.
///
/// Oracle mode without an API key, or with an HTTP client that cannot be
/// built, degrades to the rule planner with a warning.
pub fn build_planner(config: &PlannerConfig) -> Box<dyn PlanGenerator> {
    match config.mode {
        PlannerMode::Rules => {
            info!("using rule planner");
            Box::new(RulePlanner::new())
        }
        PlannerMode::Oracle => {
            let Some(api_key) = config.oracle.api_key() else {
                warn!(env = %config.oracle.api_key_env, "oracle API key missing; using rule planner");
                return Box::new(RulePlanner::new());
            };
            match HttpPlanOracle::new(config.oracle.clone(), api_key) {
                Ok(oracle) => {
                    info!(model = %config.oracle.model, "using oracle planner");
                    Box::new(OraclePlanner::new(Box::new(oracle)))
                }
                Err(e) => {
                    warn!(error = %e, "oracle unavailable; using rule planner");
                    Box::new(RulePlanner::new())
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
