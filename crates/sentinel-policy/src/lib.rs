//! # sentinel-policy
//!
//! The purchase safety policy for the SentinelFlow runtime.
//!
//! ## Overview
//!
//! This crate provides [`PurchasePolicyEngine`], which implements the
//! [`PolicyEngine`](sentinel_core::traits::PolicyEngine) trait. It denies any
//! plan without an identity, caps single purchases, checks funds, and marks
//! every allowed purchase as needing confirmation.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use sentinel_policy::PurchasePolicyEngine;
//!
//! let engine = PurchasePolicyEngine::from_file(Path::new("policy.toml"), accounts, catalog)?;
//! // Pass `engine` to `sentinel_core::Orchestrator::new(...)`.
//! ```

pub mod engine;
pub mod limits;

pub use engine::PurchasePolicyEngine;
pub use limits::PolicyLimits;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use rust_decimal::Decimal;
    use serde_json::{json, Map, Value};

    use sentinel_contracts::{
        commerce::{Account, CommerceError, Product},
        error::SentinelError,
        plan::{AgentPlan, Intent, PlanStep, ToolName},
        policy::DenyReason,
    };
    use sentinel_core::traits::{AccountService, CatalogService, PolicyEngine};

    use crate::{PolicyLimits, PurchasePolicyEngine};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Accounts and catalog backed by fixed maps; records balance lookups.
    struct FakeShop {
        balances: HashMap<String, Decimal>,
        products: HashMap<String, Product>,
        lookups: Arc<Mutex<u32>>,
    }

    impl AccountService for FakeShop {
        fn account(&self, user_id: &str) -> Result<Account, CommerceError> {
            *self.lookups.lock().unwrap() += 1;
            self.balances
                .get(user_id)
                .map(|b| Account {
                    user_id: user_id.to_string(),
                    balance: *b,
                    currency: "USD".to_string(),
                })
                .ok_or_else(|| CommerceError::AccountNotFound(user_id.to_string()))
        }

        fn debit(&self, _user_id: &str, _amount: Decimal) -> Result<Decimal, CommerceError> {
            panic!("policy must never debit");
        }
    }

    impl CatalogService for FakeShop {
        fn product(&self, product_id: &str) -> Result<Product, CommerceError> {
            self.products
                .get(product_id)
                .cloned()
                .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))
        }

        fn reserve(&self, _product_id: &str, _qty: u32) -> Result<(), CommerceError> {
            panic!("policy must never reserve");
        }

        fn search(&self, _tokens: &[String], _limit: usize) -> Result<Vec<Product>, CommerceError> {
            Ok(vec![])
        }
    }

    fn product(id: &str, price: Decimal, stock: u32) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: None,
            price,
            currency: "USD".to_string(),
            inventory_qty: stock,
            is_active: true,
        }
    }

    /// Shop with user `u-1` holding `balance` and product `p-1` at 350.99.
    fn shop(balance: Decimal) -> Arc<FakeShop> {
        Arc::new(FakeShop {
            balances: HashMap::from([("u-1".to_string(), balance)]),
            products: HashMap::from([
                ("p-1".to_string(), product("p-1", Decimal::new(35_099, 2), 30)),
                ("p-big".to_string(), product("p-big", Decimal::new(160_000, 2), 5)),
                ("p-rare".to_string(), product("p-rare", Decimal::new(1_000, 2), 1)),
            ]),
            lookups: Arc::new(Mutex::new(0)),
        })
    }

    fn engine(shop: Arc<FakeShop>) -> PurchasePolicyEngine {
        PurchasePolicyEngine::new(PolicyLimits::default(), shop.clone(), shop)
    }

    fn purchase(product_id: &str, qty: Value) -> AgentPlan {
        let args: Map<String, Value> = json!({ "user_id": "u-1", "product_id": product_id, "qty": qty })
            .as_object()
            .cloned()
            .unwrap();
        AgentPlan {
            intent: Intent::Purchase,
            steps: vec![PlanStep::tool(ToolName::ExecutePurchase, args), PlanStep::Done],
            requires_confirmation: true,
            ..AgentPlan::default()
        }
    }

    // ── 1. identity ───────────────────────────────────────────────────────────

    #[test]
    fn test_missing_identity_denies_before_any_lookup() {
        let shop = shop(Decimal::new(500_000, 2));
        let lookups = shop.lookups.clone();
        let engine = engine(shop);

        for user in [None, Some(""), Some("  ")] {
            let decision = engine.evaluate(&purchase("p-1", json!(1)), user).unwrap();
            assert!(!decision.allowed);
            assert_eq!(decision.reason, Some(DenyReason::MissingIdentity));
        }
        assert_eq!(*lookups.lock().unwrap(), 0);
    }

    // ── 2. non-purchase plans ─────────────────────────────────────────────────

    #[test]
    fn test_plan_without_purchase_is_allowed_without_confirmation() {
        let engine = engine(shop(Decimal::ZERO));
        let plan = AgentPlan {
            intent: Intent::CheckBalance,
            steps: vec![PlanStep::tool(
                ToolName::CheckBalance,
                json!({ "user_id": "u-1" }).as_object().cloned().unwrap(),
            )],
            ..AgentPlan::default()
        };

        let decision = engine.evaluate(&plan, Some("u-1")).unwrap();
        assert!(decision.allowed);
        assert!(!decision.needs_confirmation);
        assert!(decision.reason.is_none());
    }

    // ── 3. confirmation summary (Scenario A) ──────────────────────────────────

    #[test]
    fn test_affordable_purchase_requires_confirmation() {
        let engine = engine(shop(Decimal::new(500_000, 2)));
        let decision = engine.evaluate(&purchase("p-1", json!(2)), Some("u-1")).unwrap();

        assert!(decision.allowed);
        assert!(decision.needs_confirmation);
        assert_eq!(
            decision.confirmation_summary.as_deref(),
            Some("Confirm purchase of 2 item(s) (product_id=p-1) for 701.98 USD?")
        );
    }

    // ── 4. ceiling ────────────────────────────────────────────────────────────

    #[test]
    fn test_ceiling_denies_independent_of_funds() {
        let engine = engine(shop(Decimal::new(10_000_000, 2)));

        let decision = engine.evaluate(&purchase("p-big", json!(1)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::AmountExceedsLimit));

        // 5 × 350.99 = 1754.95
        let decision = engine.evaluate(&purchase("p-1", json!(5)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::AmountExceedsLimit));
    }

    #[test]
    fn test_total_equal_to_ceiling_is_allowed() {
        let shop = Arc::new(FakeShop {
            balances: HashMap::from([("u-1".to_string(), Decimal::new(200_000, 2))]),
            products: HashMap::from([("p-x".to_string(), product("p-x", Decimal::new(75_000, 2), 9))]),
            lookups: Arc::new(Mutex::new(0)),
        });
        let decision = engine(shop).evaluate(&purchase("p-x", json!(2)), Some("u-1")).unwrap();
        assert!(decision.allowed);
    }

    // ── 5. funds (Scenario E) ─────────────────────────────────────────────────

    #[test]
    fn test_insufficient_funds() {
        let engine = engine(shop(Decimal::new(1_000, 2)));
        let decision = engine.evaluate(&purchase("p-1", json!(1)), Some("u-1")).unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::InsufficientFunds));
    }

    // ── 6. typed service failures ─────────────────────────────────────────────

    #[test]
    fn test_service_failures_become_denials() {
        let engine = engine(shop(Decimal::new(500_000, 2)));

        let decision = engine.evaluate(&purchase("nope", json!(1)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::ProductNotFound));

        let decision = engine.evaluate(&purchase("p-rare", json!(3)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::OutOfStock));

        let decision = engine.evaluate(&purchase("p-1", json!(1)), Some("ghost")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::AccountNotFound));

        let decision = engine.evaluate(&purchase("p-1", json!(0)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::InvalidQuantity));
    }

    #[test]
    fn test_oversized_qty_is_invalid() {
        let engine = engine(shop(Decimal::new(500_000, 2)));

        let decision = engine
            .evaluate(&purchase("p-1", json!("99999999999999999999")), Some("u-1"))
            .unwrap();
        assert_eq!(decision.reason, Some(DenyReason::InvalidQuantity));

        let decision = engine.evaluate(&purchase("p-1", json!(5_000_000_000_u64)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::InvalidQuantity));
    }

    #[test]
    fn test_qty_as_string_and_default() {
        let engine = engine(shop(Decimal::new(500_000, 2)));

        let decision = engine.evaluate(&purchase("p-1", json!("3")), Some("u-1")).unwrap();
        assert!(decision.confirmation_summary.unwrap().starts_with("Confirm purchase of 3 item(s)"));

        let decision = engine.evaluate(&purchase("p-1", Value::Null), Some("u-1")).unwrap();
        assert!(decision.confirmation_summary.unwrap().starts_with("Confirm purchase of 1 item(s)"));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let engine = engine(shop(Decimal::new(500_000, 2)));
        let plan = purchase("p-1", json!(1));
        let first = engine.evaluate(&plan, Some("u-1")).unwrap();
        let second = engine.evaluate(&plan, Some("u-1")).unwrap();
        assert_eq!(first, second);
    }

    // ── 7. configuration ──────────────────────────────────────────────────────

    #[test]
    fn test_limits_from_toml() {
        let shop = shop(Decimal::new(500_000, 2));
        let toml = r#"
            max_single_purchase = "300.00"
        "#;

        let engine = PurchasePolicyEngine::from_toml_str(toml, shop.clone(), shop).unwrap();
        assert_eq!(engine.limits().max_single_purchase, Decimal::new(30_000, 2));

        let decision = engine.evaluate(&purchase("p-1", json!(1)), Some("u-1")).unwrap();
        assert_eq!(decision.reason, Some(DenyReason::AmountExceedsLimit));
    }

    #[test]
    fn test_limits_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_single_purchase = \"2500.00\"").unwrap();

        let shop = shop(Decimal::new(500_000, 2));
        let engine = PurchasePolicyEngine::from_file(file.path(), shop.clone(), shop).unwrap();
        assert_eq!(engine.limits().max_single_purchase, Decimal::new(250_000, 2));
    }

    #[test]
    fn test_toml_parse_error() {
        let shop = shop(Decimal::ZERO);
        let result = PurchasePolicyEngine::from_toml_str("this is not ][ toml", shop.clone(), shop);

        match result {
            Err(SentinelError::Config { reason }) => {
                assert!(reason.contains("failed to parse policy TOML"), "got: {reason}");
            }
            Err(other) => panic!("expected Config error, got {other:?}"),
            Ok(_) => panic!("expected Config error, got an engine"),
        }
    }

    #[test]
    fn test_non_positive_ceiling_is_rejected() {
        let shop = shop(Decimal::ZERO);
        let result =
            PurchasePolicyEngine::from_toml_str("max_single_purchase = \"0\"", shop.clone(), shop);
        assert!(matches!(result, Err(SentinelError::Config { .. })));
    }

    #[test]
    fn test_limits_validate() {
        assert!(PolicyLimits::default().validate().is_ok());
        let limits = PolicyLimits { max_single_purchase: Decimal::new(-1, 0) };
        assert!(matches!(limits.validate(), Err(SentinelError::Config { .. })));
    }
}
