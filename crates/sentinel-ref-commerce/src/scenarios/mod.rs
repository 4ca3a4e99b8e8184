//! Commerce reference runtime demo scenarios.
//!
//! Each scenario wires a fresh `ReferenceRuntime` over a small fixed shop and
//! drives one conversation through the real orchestrator, policy engine,
//! ledger, and audit trail. `run_scenario` prints what happened and returns
//! whether the expected outcome was observed.

pub mod confirm_purchase;
pub mod insufficient_funds;
pub mod invalid_token;
pub mod missing_identity;
pub mod select_candidate;

use std::sync::Arc;

use rust_decimal::Decimal;

use sentinel_contracts::{
    commerce::{Product, User},
    error::SentinelResult,
};

use crate::{runtime::ReferenceRuntime, store::CommerceStore};

/// A runtime over a shop with one user and three products.
pub struct ScenarioShop {
    pub runtime: ReferenceRuntime,
    pub user: User,
    pub products: Vec<Product>,
}

/// One user holding `balance`; a 350.99 keyboard, a 49.99 desk lamp, and a
/// 89.99 webcam.
pub fn scenario_shop(balance: Decimal) -> SentinelResult<ScenarioShop> {
    let store = Arc::new(CommerceStore::new());
    let user = store.add_user("Test User 1", Some("user1@example.com"), balance)?;
    let products = vec![
        store.add_product("Mechanical Keyboard", Some("Tactile switches, backlit"), Decimal::new(35_099, 2), 12)?,
        store.add_product("Desk Lamp", Some("Adjustable brightness"), Decimal::new(4_999, 2), 8)?,
        store.add_product("Webcam 1080p", Some("Autofocus webcam"), Decimal::new(8_999, 2), 5)?,
    ];
    Ok(ScenarioShop { runtime: ReferenceRuntime::with_rules(store), user, products })
}

pub(crate) fn print_reply(label: &str, message: &str) {
    println!("  {label}:");
    for line in message.lines() {
        println!("    | {line}");
    }
}

pub(crate) fn print_outcome(number: char, met: bool) {
    println!();
    println!("  Expected outcome: {}", if met { "MET" } else { "NOT MET" });
    println!("  Scenario {number} complete.");
    println!();
}

/// Run all five scenarios. Returns how many met their expected outcome.
pub fn run_all() -> SentinelResult<usize> {
    let results = [
        confirm_purchase::run_scenario()?,
        missing_identity::run_scenario()?,
        select_candidate::run_scenario()?,
        invalid_token::run_scenario()?,
        insufficient_funds::run_scenario()?,
    ];
    Ok(results.iter().filter(|met| **met).count())
}
