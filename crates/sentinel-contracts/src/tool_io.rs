//! Input and output contracts for the four registry tools.
//!
//! Inputs are parsed from the loosely-typed argument map of a `ToolCall` and
//! then bounds-checked with `validate()`. Outputs are what handlers return
//! and what the audit trail snapshots.

use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::commerce::ProductCandidate;

/// Tables `update_database` may target.
pub const UPDATABLE_TABLES: [&str; 4] = ["users", "accounts", "products", "transactions"];

/// Parse a tool argument map into a typed input and validate it.
///
/// The error string is what ends up in the audit entry and the user-facing
/// tool error message.
pub fn parse_input<T>(args: &Map<String, Value>) -> Result<T, String>
where
    T: DeserializeOwned + ToolInput,
{
    let input: T = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| format!("invalid_input: {e}"))?;
    input.validate()?;
    Ok(input)
}

/// Bounds checks that serde alone cannot express.
pub trait ToolInput {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckBalanceIn {
    pub user_id: String,
}

impl ToolInput for CheckBalanceIn {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("invalid_input: user_id must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckBalanceOut {
    pub user_id: String,
    pub balance: Decimal,
    pub currency: String,
}

fn default_limit() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProductsIn {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl ToolInput for SearchProductsIn {
    fn validate(&self) -> Result<(), String> {
        let len = self.query.chars().count();
        if len == 0 || len > 120 {
            return Err("invalid_input: query must be 1..=120 characters".to_string());
        }
        if !(1..=10).contains(&self.limit) {
            return Err("invalid_input: limit must be 1..=10".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProductsOut {
    pub results: Vec<ProductCandidate>,
}

fn default_qty() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutePurchaseIn {
    pub user_id: String,
    pub product_id: String,
    #[serde(default = "default_qty")]
    pub qty: u32,
    pub idempotency_key: String,
    /// Must be `true` for the purchase to execute.
    #[serde(default)]
    pub confirm: bool,
}

impl ToolInput for ExecutePurchaseIn {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() || self.product_id.trim().is_empty() {
            return Err("invalid_input: user_id and product_id are required".to_string());
        }
        if !(1..=999).contains(&self.qty) {
            return Err("invalid_input: qty must be 1..=999".to_string());
        }
        let key_len = self.idempotency_key.chars().count();
        if !(8..=80).contains(&key_len) {
            return Err("invalid_input: idempotency_key must be 8..=80 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutePurchaseOut {
    pub transaction_id: String,
    pub status: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub remaining_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDatabaseIn {
    pub table: String,
    pub key: String,
    pub value: String,
}

impl ToolInput for UpdateDatabaseIn {
    fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("invalid_input: key must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDatabaseOut {
    pub status: String,
}
