//! The agent plan JSON Schema and its strict-mode form.
//!
//! `plan_json_schema()` describes `AgentPlan` the way a lenient producer sees
//! it: optional members, defaults, shared definitions under `$defs`. External
//! generators running in strict structured-output mode reject most of that,
//! so `strictify()` rewrites a schema into the shape they accept:
//!
//! - every `default` is removed;
//! - a node holding `$ref` keeps nothing but the `$ref`;
//! - every object gets `additionalProperties: false` and lists all of its
//!   properties as `required`;
//! - a property that was not required becomes nullable instead of omittable.

use serde_json::{json, Map, Value};

use sentinel_contracts::verify::{PlanRule, PlanSchema};

/// Identifier of the strict plan schema handed to external generators.
pub const STRICT_PLAN_SCHEMA_ID: &str = "agent-plan-strict-v1";

/// The lenient `AgentPlan` schema.
pub fn plan_json_schema() -> Value {
    json!({
        "title": "AgentPlan",
        "type": "object",
        "$defs": {
            "Intent": {
                "type": "string",
                "enum": ["check_balance", "purchase", "update_record", "unknown"]
            },
            "ToolName": {
                "type": "string",
                "enum": ["check_balance", "search_products", "execute_purchase", "update_database"]
            },
            "PlanStepType": {
                "type": "string",
                "enum": ["tool_call", "ask_user", "done"]
            },
            "RiskLevel": {
                "type": "string",
                "enum": ["low", "medium", "high"]
            },
            "ToolArguments": {
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" },
                    "product_id": { "type": "string" },
                    "qty": { "type": "integer" },
                    "query": { "type": "string" },
                    "limit": { "type": "integer" },
                    "table": { "type": "string" },
                    "key": { "type": "string" },
                    "value": { "type": "string" }
                }
            },
            "ToolCall": {
                "type": "object",
                "properties": {
                    "tool_name": { "$ref": "#/$defs/ToolName" },
                    "arguments": { "$ref": "#/$defs/ToolArguments", "default": {} }
                },
                "required": ["tool_name", "arguments"]
            },
            "PlanStep": {
                "type": "object",
                "properties": {
                    "step_type": { "$ref": "#/$defs/PlanStepType" },
                    "tool_call": {
                        "anyOf": [{ "$ref": "#/$defs/ToolCall" }, { "type": "null" }],
                        "default": null
                    },
                    "user_message": {
                        "anyOf": [{ "type": "string" }, { "type": "null" }],
                        "default": null
                    }
                },
                "required": ["step_type"]
            }
        },
        "properties": {
            "intent": { "$ref": "#/$defs/Intent", "default": "unknown" },
            "steps": {
                "type": "array",
                "items": { "$ref": "#/$defs/PlanStep" },
                "default": []
            },
            "requires_confirmation": { "type": "boolean", "default": false },
            "confirmation_summary": {
                "anyOf": [{ "type": "string" }, { "type": "null" }],
                "default": null
            },
            "risk_level": { "$ref": "#/$defs/RiskLevel", "default": "low" }
        }
    })
}

/// The schema external generators are asked to satisfy.
pub fn strict_plan_schema() -> Value {
    strictify(&plan_json_schema())
}

/// The `PlanSchema` untrusted plans are verified against: the strict schema
/// plus every semantic rule.
pub fn default_plan_schema() -> PlanSchema {
    PlanSchema {
        schema_id: STRICT_PLAN_SCHEMA_ID.to_string(),
        json_schema: strict_plan_schema(),
        rules: vec![
            PlanRule::NonEmptySteps,
            PlanRule::NonEmptyToolArguments,
            PlanRule::PurchaseRequiresConfirmation,
        ],
    }
}

/// Rewrite `schema` into its strict structured-output form.
pub fn strictify(schema: &Value) -> Value {
    close_objects(strip_defaults(schema))
}

fn strip_defaults(node: &Value) -> Value {
    match node {
        Value::Array(items) => Value::Array(items.iter().map(strip_defaults).collect()),
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                return json!({ "$ref": reference });
            }
            Value::Object(
                map.iter()
                    .filter(|(k, _)| k.as_str() != "default")
                    .map(|(k, v)| (k.clone(), strip_defaults(v)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

fn close_objects(node: Value) -> Value {
    match node {
        Value::Array(items) => Value::Array(items.into_iter().map(close_objects).collect()),
        Value::Object(map) => {
            let mut map: Map<String, Value> =
                map.into_iter().map(|(k, v)| (k, close_objects(v))).collect();

            let is_object = map.get("type").and_then(Value::as_str) == Some("object")
                || map.contains_key("properties");
            if is_object {
                close_object(&mut map);
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn close_object(map: &mut Map<String, Value>) {
    let originally_required: Vec<String> = map
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut properties = match map.remove("properties") {
        Some(Value::Object(p)) => p,
        _ => Map::new(),
    };
    for (name, prop) in properties.iter_mut() {
        if !originally_required.contains(name) {
            *prop = allow_null(std::mem::take(prop));
        }
    }

    let required: Vec<Value> = properties.keys().cloned().map(Value::String).collect();
    map.insert("properties".to_string(), Value::Object(properties));
    map.insert("required".to_string(), Value::Array(required));
    map.insert("additionalProperties".to_string(), Value::Bool(false));
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// Wrap `schema` so that it also accepts `null`, unless it already does.
fn allow_null(schema: Value) -> Value {
    if is_null_schema(&schema) {
        return schema;
    }
    let nullable = schema
        .get("anyOf")
        .and_then(Value::as_array)
        .is_some_and(|branches| branches.iter().any(is_null_schema));
    if nullable {
        return schema;
    }
    json!({ "anyOf": [schema, { "type": "null" }] })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn walk<'v>(node: &'v Value, out: &mut Vec<&'v Value>) {
        out.push(node);
        match node {
            Value::Array(items) => items.iter().for_each(|i| walk(i, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    #[test]
    fn test_strict_schema_has_no_defaults_and_lone_refs() {
        let strict = strict_plan_schema();
        let mut nodes = Vec::new();
        walk(&strict, &mut nodes);

        for node in nodes {
            if let Value::Object(map) = node {
                assert!(!map.contains_key("default"), "default left in {node}");
                if map.contains_key("$ref") {
                    assert_eq!(map.len(), 1, "$ref with siblings: {node}");
                }
            }
        }
    }

    #[test]
    fn test_every_object_is_closed_and_fully_required() {
        let strict = strict_plan_schema();
        let mut nodes = Vec::new();
        walk(&strict, &mut nodes);

        let objects: Vec<&Value> = nodes
            .into_iter()
            .filter(|n| n.get("type").and_then(Value::as_str) == Some("object"))
            .collect();
        assert!(objects.len() >= 4);

        for object in objects {
            assert_eq!(object["additionalProperties"], json!(false));
            let props = object["properties"].as_object().unwrap();
            let required = object["required"].as_array().unwrap();
            assert_eq!(props.len(), required.len(), "not fully required: {object}");
        }
    }

    #[test]
    fn test_optional_members_become_nullable() {
        let strict = strict_plan_schema();

        // Not required before, so wrapped.
        assert_eq!(
            strict["properties"]["intent"],
            json!({ "anyOf": [{ "$ref": "#/$defs/Intent" }, { "type": "null" }] })
        );
        // Already nullable, so left alone.
        assert_eq!(
            strict["$defs"]["PlanStep"]["properties"]["user_message"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] })
        );
        // Required before, so kept as is.
        assert_eq!(
            strict["$defs"]["PlanStep"]["properties"]["step_type"],
            json!({ "$ref": "#/$defs/PlanStepType" })
        );
        assert_eq!(
            strict["$defs"]["ToolArguments"]["properties"]["qty"],
            json!({ "anyOf": [{ "type": "integer" }, { "type": "null" }] })
        );
    }

    #[test]
    fn test_strictify_is_idempotent() {
        let once = strict_plan_schema();
        assert_eq!(strictify(&once), once);
    }

    #[test]
    fn test_ref_siblings_are_dropped() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "$ref": "#/$defs/A", "description": "x", "default": 1 }
            },
            "required": ["a"]
        });
        let strict = strictify(&schema);
        assert_eq!(strict["properties"]["a"], json!({ "$ref": "#/$defs/A" }));
    }
}
