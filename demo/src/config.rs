//! The demo's TOML configuration file.
//!
//! Every table is optional; missing keys take their defaults.
//!
//! ```toml
//! [planner]
//! mode = "oracle"
//!
//! [planner.oracle]
//! model = "gpt-4o-mini"
//! timeout_ms = 10000
//!
//! [policy]
//! max_single_purchase = "1500.00"
//!
//! [orchestrator]
//! ledger_window = 25
//! ```

use std::path::Path;

use serde::Deserialize;

use sentinel_contracts::error::{SentinelError, SentinelResult};
use sentinel_core::OrchestratorConfig;
use sentinel_planner::PlannerConfig;
use sentinel_policy::PolicyLimits;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub planner: PlannerConfig,
    pub policy: PolicyLimits,
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SentinelError::Config {
            reason: format!("failed to parse config TOML: {e}"),
        })?;
        config.planner.validate()?;
        config.policy.validate()?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::Config {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }
}
