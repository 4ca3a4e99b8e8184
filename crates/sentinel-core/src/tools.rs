//! The four backend tools.
//!
//! Each handler parses its typed input from the tool call's argument map,
//! calls into the commerce services, and returns its typed output as JSON.
//! Service failures come back as `ToolFailure::Failed` carrying the stable
//! error code.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use sentinel_contracts::{
    commerce::CommerceError,
    plan::ToolName,
    tool_io::{
        parse_input, CheckBalanceIn, CheckBalanceOut, ExecutePurchaseIn, ExecutePurchaseOut,
        SearchProductsIn, SearchProductsOut, UpdateDatabaseIn, UpdateDatabaseOut,
        UPDATABLE_TABLES,
    },
};

use crate::{
    payments,
    traits::{AccountService, CatalogService, CommerceServices},
};

/// Why a handler did not produce output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The handler refused to act (audited as `blocked`).
    Blocked(String),
    /// The handler tried and failed (audited as `error`).
    Failed(String),
}

impl ToolFailure {
    pub fn message(&self) -> &str {
        match self {
            ToolFailure::Blocked(m) | ToolFailure::Failed(m) => m,
        }
    }
}

impl From<CommerceError> for ToolFailure {
    fn from(err: CommerceError) -> Self {
        ToolFailure::Failed(err.code().to_string())
    }
}

/// A named backend operation invocable through the registry.
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> ToolName;
    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolFailure>;
}

fn parse<T>(args: &Map<String, Value>) -> Result<T, ToolFailure>
where
    T: serde::de::DeserializeOwned + sentinel_contracts::tool_io::ToolInput,
{
    parse_input(args).map_err(ToolFailure::Failed)
}

fn to_output<T: Serialize>(out: &T) -> Result<Value, ToolFailure> {
    serde_json::to_value(out).map_err(|e| ToolFailure::Failed(format!("output encoding: {e}")))
}

// ── check_balance ────────────────────────────────────────────────────────────

pub struct CheckBalanceTool {
    accounts: Arc<dyn AccountService>,
}

impl CheckBalanceTool {
    pub fn new(accounts: Arc<dyn AccountService>) -> Self {
        Self { accounts }
    }
}

impl ToolHandler for CheckBalanceTool {
    fn name(&self) -> ToolName {
        ToolName::CheckBalance
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let input: CheckBalanceIn = parse(args)?;
        let account = self.accounts.account(&input.user_id)?;
        to_output(&CheckBalanceOut {
            user_id: input.user_id,
            balance: account.balance,
            currency: account.currency,
        })
    }
}

// ── search_products ──────────────────────────────────────────────────────────

const SEARCH_STOPWORDS: [&str; 14] = [
    "buy", "purchase", "order", "need", "want", "me", "a", "an", "the", "please", "can", "you",
    "to", "for",
];

/// Lowercase, replace non-alphanumerics with spaces, drop stopwords.
///
/// If every token is a stopword the whole cleaned query is used as a single
/// token, so a search is never run with nothing to match.
pub fn normalize_query(query: &str) -> Vec<String> {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let tokens: Vec<String> = cleaned
        .split_whitespace()
        .filter(|t| !SEARCH_STOPWORDS.contains(t))
        .map(str::to_string)
        .collect();

    if !tokens.is_empty() {
        return tokens;
    }
    let fallback = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if fallback.is_empty() {
        Vec::new()
    } else {
        vec![fallback]
    }
}

pub struct SearchProductsTool {
    catalog: Arc<dyn CatalogService>,
}

impl SearchProductsTool {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }
}

impl ToolHandler for SearchProductsTool {
    fn name(&self) -> ToolName {
        ToolName::SearchProducts
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let input: SearchProductsIn = parse(args)?;
        let tokens = normalize_query(&input.query);
        let results = if tokens.is_empty() {
            Vec::new()
        } else {
            self.catalog
                .search(&tokens, input.limit as usize)?
                .iter()
                .map(|p| p.candidate())
                .collect()
        };
        to_output(&SearchProductsOut { results })
    }
}

// ── execute_purchase ─────────────────────────────────────────────────────────

pub struct ExecutePurchaseTool {
    services: CommerceServices,
}

impl ExecutePurchaseTool {
    pub fn new(services: CommerceServices) -> Self {
        Self { services }
    }
}

impl ToolHandler for ExecutePurchaseTool {
    fn name(&self) -> ToolName {
        ToolName::ExecutePurchase
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let input: ExecutePurchaseIn = parse(args)?;

        // Refuses regardless of what the caller's policy check said.
        if !input.confirm {
            return Err(ToolFailure::Blocked("confirmation_required".to_string()));
        }

        let tx = payments::execute_purchase(
            &self.services,
            &input.user_id,
            &input.product_id,
            input.qty,
            &input.idempotency_key,
        )?;

        to_output(&ExecutePurchaseOut {
            transaction_id: tx.id,
            status: tx.status.as_str().to_string(),
            total_amount: tx.total_amount,
            currency: tx.currency,
            remaining_balance: tx.remaining_balance,
        })
    }
}

// ── update_database ──────────────────────────────────────────────────────────

/// Records the intent of an update against an allow-listed table. Performs no
/// raw writes.
pub struct UpdateDatabaseTool;

impl ToolHandler for UpdateDatabaseTool {
    fn name(&self) -> ToolName {
        ToolName::UpdateDatabase
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let input: UpdateDatabaseIn = parse(args)?;
        if !UPDATABLE_TABLES.contains(&input.table.as_str()) {
            return Err(ToolFailure::Failed("table_not_allowed".to_string()));
        }
        to_output(&UpdateDatabaseOut {
            status: format!("queued_update:{}:{}", input.table, input.key),
        })
    }
}
