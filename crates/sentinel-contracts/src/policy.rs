//! Policy decision types.
//!
//! The policy engine consumes a plan plus the caller's claimed identity and
//! produces a `PolicyDecision`. A denial is a value, not an error: it is
//! relayed to the user verbatim with a stable reason code.

use serde::{Deserialize, Serialize};

/// Why a plan was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No identity was supplied with the turn.
    MissingIdentity,
    /// The purchase total exceeds the hard per-purchase ceiling.
    AmountExceedsLimit,
    /// The purchase total exceeds the identity's available funds.
    InsufficientFunds,
    ProductNotFound,
    OutOfStock,
    AccountNotFound,
    InvalidQuantity,
}

impl DenyReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::MissingIdentity => "missing_user_id",
            DenyReason::AmountExceedsLimit => "purchase_amount_exceeds_limit",
            DenyReason::InsufficientFunds => "insufficient_funds",
            DenyReason::ProductNotFound => "product_not_found",
            DenyReason::OutOfStock => "out_of_stock",
            DenyReason::AccountNotFound => "account_not_found",
            DenyReason::InvalidQuantity => "invalid_quantity",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DenyReason::MissingIdentity => "missing identity",
            DenyReason::AmountExceedsLimit => "amount exceeds limit",
            DenyReason::InsufficientFunds => "insufficient funds",
            DenyReason::ProductNotFound => "product not found",
            DenyReason::OutOfStock => "out of stock",
            DenyReason::AccountNotFound => "account not found",
            DenyReason::InvalidQuantity => "invalid quantity",
        };
        f.write_str(text)
    }
}

/// The allow / deny / confirm verdict for one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub needs_confirmation: bool,
    pub confirmation_summary: Option<String>,
    pub reason: Option<DenyReason>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            needs_confirmation: false,
            confirmation_summary: None,
            reason: None,
        }
    }

    pub fn confirm(summary: impl Into<String>) -> Self {
        Self {
            allowed: true,
            needs_confirmation: true,
            confirmation_summary: Some(summary.into()),
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            needs_confirmation: false,
            confirmation_summary: None,
            reason: Some(reason),
        }
    }
}
