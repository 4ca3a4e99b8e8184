//! Purchase safety policy.
//!
//! `PurchasePolicyEngine` implements the `PolicyEngine` trait from
//! sentinel-core. It holds no state of its own beyond its limits; prices,
//! stock, and balances are read from the commerce services on every call.
//!
//! Evaluation algorithm, first terminal rule wins:
//!
//! 1. No identity → deny `missing identity`.
//! 2. No `execute_purchase` call in the plan → allow, no confirmation.
//! 3. Resolve price and currency for the first purchase call and compute
//!    `total = unit_price × qty`, rounded to the currency minor unit.
//! 4. `total` above the ceiling → deny `amount exceeds limit`.
//! 5. `total` above the identity's balance → deny `insufficient funds`.
//! 6. Otherwise allow and require confirmation, with a summary.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use sentinel_contracts::{
    commerce::{purchase_total, CommerceError},
    error::{SentinelError, SentinelResult},
    plan::{AgentPlan, ToolCall},
    policy::{DenyReason, PolicyDecision},
};
use sentinel_core::traits::{AccountService, CatalogService, PolicyEngine};

use crate::limits::PolicyLimits;

/// A `PolicyEngine` enforcing the purchase ceiling and available funds.
///
/// ```rust,ignore
/// use sentinel_policy::PurchasePolicyEngine;
///
/// let engine = PurchasePolicyEngine::from_file(Path::new("policy.toml"), accounts, catalog)?;
/// ```
pub struct PurchasePolicyEngine {
    limits: PolicyLimits,
    accounts: Arc<dyn AccountService>,
    catalog: Arc<dyn CatalogService>,
}

impl PurchasePolicyEngine {
    pub fn new(
        limits: PolicyLimits,
        accounts: Arc<dyn AccountService>,
        catalog: Arc<dyn CatalogService>,
    ) -> Self {
        Self { limits, accounts, catalog }
    }

    /// Parse `s` as TOML `PolicyLimits` and build an engine.
    ///
    /// Returns `SentinelError::Config` if the TOML is malformed or does not
    /// match the expected schema.
    pub fn from_toml_str(
        s: &str,
        accounts: Arc<dyn AccountService>,
        catalog: Arc<dyn CatalogService>,
    ) -> SentinelResult<Self> {
        let limits: PolicyLimits = toml::from_str(s).map_err(|e| SentinelError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        limits.validate()?;
        Ok(Self::new(limits, accounts, catalog))
    }

    pub fn from_file(
        path: &Path,
        accounts: Arc<dyn AccountService>,
        catalog: Arc<dyn CatalogService>,
    ) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents, accounts, catalog)
    }

    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    fn evaluate_purchase(&self, call: &ToolCall, user_id: &str) -> SentinelResult<PolicyDecision> {
        let Some(product_id) = call.str_arg("product_id") else {
            return Ok(PolicyDecision::deny(DenyReason::ProductNotFound));
        };
        let Some(qty) = purchase_qty(call.arguments.get("qty")) else {
            return Ok(PolicyDecision::deny(DenyReason::InvalidQuantity));
        };

        let (unit_price, currency) = match self.catalog.check_available(product_id, qty) {
            Ok(found) => found,
            Err(err) => return deny_for(err),
        };

        let total = purchase_total(unit_price, qty);

        debug!(product_id = %product_id, qty, total = %total, "purchase priced");

        if total > self.limits.max_single_purchase {
            warn!(
                total = %total,
                ceiling = %self.limits.max_single_purchase,
                "purchase exceeds single purchase ceiling"
            );
            return Ok(PolicyDecision::deny(DenyReason::AmountExceedsLimit));
        }

        let account = match self.accounts.account(user_id) {
            Ok(account) => account,
            Err(err) => return deny_for(err),
        };
        if account.balance < total {
            debug!(user_id = %user_id, balance = %account.balance, total = %total, "funds short");
            return Ok(PolicyDecision::deny(DenyReason::InsufficientFunds));
        }

        Ok(PolicyDecision::confirm(format!(
            "Confirm purchase of {qty} item(s) (product_id={product_id}) for {total} {currency}?"
        )))
    }
}

impl PolicyEngine for PurchasePolicyEngine {
    fn evaluate(&self, plan: &AgentPlan, user_id: Option<&str>) -> SentinelResult<PolicyDecision> {
        let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) else {
            debug!("no identity supplied, denying");
            return Ok(PolicyDecision::deny(DenyReason::MissingIdentity));
        };

        match plan.purchase_call() {
            None => Ok(PolicyDecision::allow()),
            Some(call) => self.evaluate_purchase(call, user_id),
        }
    }
}

/// `qty` argument, defaulting to 1. Accepts a JSON integer or a numeric
/// string; anything else, zero included, is invalid.
fn purchase_qty(value: Option<&Value>) -> Option<u32> {
    let qty = match value {
        None | Some(Value::Null) => 1,
        Some(Value::Number(n)) => u32::try_from(n.as_u64()?).ok()?,
        Some(Value::String(s)) => s.trim().parse().ok()?,
        Some(_) => return None,
    };
    (qty >= 1).then_some(qty)
}

/// Typed service failures become denials; only storage faults propagate.
fn deny_for(err: CommerceError) -> SentinelResult<PolicyDecision> {
    let reason = match err {
        CommerceError::ProductNotFound(_) => DenyReason::ProductNotFound,
        CommerceError::OutOfStock { .. } => DenyReason::OutOfStock,
        CommerceError::AccountNotFound(_) => DenyReason::AccountNotFound,
        CommerceError::InsufficientFunds => DenyReason::InsufficientFunds,
        CommerceError::InvalidQuantity | CommerceError::InvalidAmount => DenyReason::InvalidQuantity,
        CommerceError::Storage(_) => return Err(SentinelError::Commerce(err)),
    };
    Ok(PolicyDecision::deny(reason))
}
