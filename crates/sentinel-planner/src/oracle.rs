//! The external plan oracle.
//!
//! `PlanOracle` is the one capability the planner needs from an external
//! reasoning service: given instructions and a strict JSON Schema, return the
//! raw text of a plan. Everything it returns is untrusted.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use sentinel_contracts::error::{SentinelError, SentinelResult};

use crate::config::OracleConfig;

/// A source of raw plan text.
pub trait PlanOracle: Send + Sync {
    /// Ask for a plan. `schema` is the strict schema the answer must match.
    fn complete(&self, system: &str, instructions: &str, schema: &Value) -> SentinelResult<String>;
}

// ── HTTP oracle ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// `PlanOracle` over an OpenAI-compatible chat completions endpoint, using
/// structured outputs in strict mode.
pub struct HttpPlanOracle {
    client: reqwest::blocking::Client,
    config: OracleConfig,
    api_key: String,
}

impl HttpPlanOracle {
    /// Returns `SentinelError::Config` if the HTTP client cannot be built.
    pub fn new(config: OracleConfig, api_key: String) -> SentinelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SentinelError::Config {
                reason: format!("failed to create oracle HTTP client: {e}"),
            })?;
        Ok(Self { client, config, api_key })
    }

    fn request_body(&self, system: &str, instructions: &str, schema: &Value) -> Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "top_p": 1,
            "messages": [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: instructions },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "agent_plan",
                    "strict": true,
                    "schema": schema,
                }
            }
        })
    }
}

impl PlanOracle for HttpPlanOracle {
    fn complete(&self, system: &str, instructions: &str, schema: &Value) -> SentinelResult<String> {
        let body = self.request_body(system, instructions, schema);
        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting plan");

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SentinelError::Oracle { reason: format!("request failed: {e}") })?;

        if !resp.status().is_success() {
            return Err(SentinelError::Oracle {
                reason: format!("oracle returned HTTP {}", resp.status()),
            });
        }

        let parsed: CompletionResponse = resp.json().map_err(|e| SentinelError::Oracle {
            reason: format!("failed to parse completion response: {e}"),
        })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| SentinelError::Oracle { reason: "completion has no choices".to_string() })?;

        if let Some(refusal) = message.refusal {
            return Err(SentinelError::Oracle { reason: format!("oracle refused: {refusal}") });
        }
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SentinelError::Oracle { reason: "completion has no content".to_string() })
    }
}

// ── Output extraction ─────────────────────────────────────────────────────────

static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object regex"));

/// The first JSON object in `text`, tolerating prose or code fences around it.
pub fn extract_json_object(text: &str) -> SentinelResult<Value> {
    let text = text.trim();
    let candidate = if text.starts_with('{') && text.ends_with('}') {
        text
    } else {
        JSON_OBJECT_RE
            .find(text)
            .map(|m| m.as_str())
            .ok_or_else(|| SentinelError::Oracle {
                reason: "no JSON object found in oracle output".to_string(),
            })?
    };

    let value: Value = serde_json::from_str(candidate).map_err(|e| SentinelError::Oracle {
        reason: format!("oracle output is not valid JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(SentinelError::Oracle { reason: "oracle output is not an object".to_string() });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let value = extract_json_object("  {\"steps\": []}\n").unwrap();
        assert_eq!(value, json!({ "steps": [] }));
    }

    #[test]
    fn test_extract_from_surrounding_prose() {
        let text = "Here is the plan:\n```json\n{\"intent\": \"purchase\", \"steps\": [{\"step_type\": \"done\"}]}\n```\nDone.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["intent"], json!("purchase"));
    }

    #[test]
    fn test_extract_failures() {
        assert!(matches!(extract_json_object("no json here"), Err(SentinelError::Oracle { .. })));
        assert!(matches!(extract_json_object("{not: json}"), Err(SentinelError::Oracle { .. })));
        assert!(matches!(extract_json_object(""), Err(SentinelError::Oracle { .. })));
    }

    #[test]
    fn test_request_body_uses_strict_structured_output() {
        let oracle = HttpPlanOracle::new(OracleConfig::default(), "k".to_string()).unwrap();
        let body = oracle.request_body("sys", "do it", &json!({ "type": "object" }));

        assert_eq!(body["model"], json!("gpt-4o-mini"));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("do it"));
        assert_eq!(body["response_format"]["json_schema"]["strict"], json!(true));
        assert_eq!(body["response_format"]["json_schema"]["schema"], json!({ "type": "object" }));
    }

    #[test]
    fn test_unreachable_endpoint_is_an_oracle_error() {
        let config = OracleConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            timeout_ms: 500,
            ..OracleConfig::default()
        };
        let oracle = HttpPlanOracle::new(config, "k".to_string()).unwrap();
        let result = oracle.complete("sys", "hi", &json!({}));
        assert!(matches!(result, Err(SentinelError::Oracle { .. })));
    }
}
