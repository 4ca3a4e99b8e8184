//! Commerce records and the typed failures of the account and catalog services.
//!
//! Money is always `rust_decimal::Decimal`, never floating point.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places in every supported currency's minor unit.
pub const CURRENCY_SCALE: u32 = 2;

/// Round `amount` to the currency minor unit (half away from zero).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price × qty` in the minor unit. Policy prices a purchase with this
/// and execution charges exactly this.
pub fn purchase_total(unit_price: Decimal, qty: u32) -> Decimal {
    round_money(unit_price * Decimal::from(qty))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub balance: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub inventory_qty: u32,
    pub is_active: bool,
}

impl Product {
    pub fn candidate(&self) -> ProductCandidate {
        ProductCandidate {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            currency: self.currency.clone(),
            inventory_qty: self.inventory_qty,
        }
    }
}

/// A product as shown to the user in a numbered search result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCandidate {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub inventory_qty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Canceled,
    Settled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::Settled => "settled",
        }
    }
}

/// A financial record produced by a successful purchase.
///
/// `(user_id, idempotency_key)` is unique across all transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub qty: u32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub idempotency_key: String,
    /// Account balance right after the debit, kept for receipts on replay.
    pub remaining_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Typed failures raised by the account, catalog, and transaction services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    #[error("account not found for user_id={0}")]
    AccountNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("out of stock: {product_id} (requested {requested}, available {available})")]
    OutOfStock { product_id: String, requested: u32, available: u32 },

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("qty must be >= 1")]
    InvalidQuantity,

    #[error("amount must be > 0")]
    InvalidAmount,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl CommerceError {
    /// Stable snake_case code used in user-facing messages and audit entries.
    pub fn code(&self) -> &'static str {
        match self {
            CommerceError::AccountNotFound(_) => "account_not_found",
            CommerceError::ProductNotFound(_) => "product_not_found",
            CommerceError::OutOfStock { .. } => "out_of_stock",
            CommerceError::InsufficientFunds => "insufficient_funds",
            CommerceError::InvalidQuantity => "invalid_quantity",
            CommerceError::InvalidAmount => "invalid_amount",
            CommerceError::Storage(_) => "storage_failure",
        }
    }
}
