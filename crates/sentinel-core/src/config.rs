//! Orchestrator tuning, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use sentinel_contracts::error::{SentinelError, SentinelResult};

/// Knobs for the per-turn state machine.
///
/// ```toml
/// ledger_window = 25
/// search_limit = 5
/// default_qty = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How many of a session's most recent traces keep their confirmation
    /// tokens addressable.
    pub ledger_window: usize,
    /// Result count for searches the orchestrator runs on its own.
    pub search_limit: u32,
    /// Quantity used when a candidate is picked without a remembered quantity.
    pub default_qty: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { ledger_window: 25, search_limit: 5, default_qty: 1 }
    }
}

impl OrchestratorConfig {
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SentinelError::Config {
            reason: format!("failed to parse orchestrator TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::Config {
            reason: format!("failed to read orchestrator config '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> SentinelResult<()> {
        if self.ledger_window == 0 {
            return Err(SentinelError::Config { reason: "ledger_window must be >= 1".to_string() });
        }
        if !(1..=10).contains(&self.search_limit) {
            return Err(SentinelError::Config {
                reason: "search_limit must be 1..=10".to_string(),
            });
        }
        if !(1..=999).contains(&self.default_qty) {
            return Err(SentinelError::Config {
                reason: "default_qty must be 1..=999".to_string(),
            });
        }
        Ok(())
    }
}
