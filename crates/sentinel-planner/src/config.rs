//! Planner mode and oracle settings, loadable from TOML.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sentinel_contracts::error::{SentinelError, SentinelResult};

/// Which plan generator an orchestrator is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
    /// Deterministic keyword rules only.
    #[default]
    Rules,
    /// External oracle, falling back to the rules on any failure.
    Oracle,
}

impl FromStr for PlannerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" | "heuristic" => Ok(PlannerMode::Rules),
            "oracle" | "llm" => Ok(PlannerMode::Oracle),
            other => Err(format!("unknown planner mode '{other}' (expected rules or oracle)")),
        }
    }
}

impl std::fmt::Display for PlannerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerMode::Rules => f.write_str("rules"),
            PlannerMode::Oracle => f.write_str("oracle"),
        }
    }
}

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never read from a file.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "SENTINEL_ORACLE_API_KEY".to_string(),
            timeout_ms: 15_000,
            temperature: 0.0,
        }
    }
}

impl OracleConfig {
    /// The API key from the environment, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// ```toml
/// mode = "oracle"
///
/// [oracle]
/// model = "gpt-4o-mini"
/// timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub mode: PlannerMode,
    pub oracle: OracleConfig,
}

impl PlannerConfig {
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SentinelError::Config {
            reason: format!("failed to parse planner TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::Config {
            reason: format!("failed to read planner config '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> SentinelResult<()> {
        if self.oracle.endpoint.trim().is_empty() {
            return Err(SentinelError::Config { reason: "oracle.endpoint must be set".to_string() });
        }
        if self.oracle.timeout_ms == 0 {
            return Err(SentinelError::Config {
                reason: "oracle.timeout_ms must be > 0".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(SentinelError::Config {
                reason: "oracle.temperature must be within 0..=2".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(config.mode, PlannerMode::Rules);
        assert_eq!(config.oracle.api_key_env, "SENTINEL_ORACLE_API_KEY");
        assert_eq!(config.oracle.timeout_ms, 15_000);
    }

    #[test]
    fn test_oracle_table_overrides() {
        let toml = r#"
            mode = "oracle"

            [oracle]
            model = "local-planner"
            endpoint = "http://127.0.0.1:8080/v1/chat/completions"
        "#;
        let config = PlannerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.mode, PlannerMode::Oracle);
        assert_eq!(config.oracle.model, "local-planner");
        assert_eq!(config.oracle.timeout_ms, 15_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PlannerConfig::from_toml_str("mode = \"dream\""),
            Err(SentinelError::Config { .. })
        ));
        assert!(matches!(
            PlannerConfig::from_toml_str("[oracle]\ntimeout_ms = 0"),
            Err(SentinelError::Config { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"oracle\"").unwrap();
        let config = PlannerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, PlannerMode::Oracle);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Rules".parse::<PlannerMode>().unwrap(), PlannerMode::Rules);
        assert_eq!("llm".parse::<PlannerMode>().unwrap(), PlannerMode::Oracle);
        assert!("other".parse::<PlannerMode>().is_err());
    }

    #[test]
    fn test_missing_api_key_env() {
        let config = OracleConfig {
            api_key_env: "SENTINEL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OracleConfig::default()
        };
        assert!(config.api_key().is_none());
    }
}
