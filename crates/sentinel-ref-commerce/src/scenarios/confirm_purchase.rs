//! Scenario A: Purchase with explicit product id
//!
//! A user with 5000.00 asks to buy one 350.99 keyboard by id. The plan is
//! allowed by policy but needs confirmation, so the reply carries a
//! single-use token instead of executing. Confirming the token executes the
//! purchase exactly once; replaying it is refused.

use rust_decimal::Decimal;

use sentinel_contracts::error::SentinelResult;
use sentinel_core::orchestrator::TOKEN_ALREADY_USED;

use super::{print_outcome, print_reply, scenario_shop};

pub fn run_scenario() -> SentinelResult<bool> {
    println!("=== Scenario A: Purchase by product id ===");
    println!();

    let shop = scenario_shop(Decimal::new(500_000, 2))?;
    let keyboard = &shop.products[0];
    let user = shop.user.id.as_str();

    println!("  User balance: 5000.00 USD");
    println!("  Product:      {} at {} {}", keyboard.name, keyboard.price, keyboard.currency);
    println!();

    let message = format!("buy product_id={} qty=1", keyboard.id);
    let ask = shop.runtime.chat("scenario-a", Some(user), &message)?;
    print_reply("Assistant", &ask.message);

    let prompted = ask.needs_confirmation
        && ask.confirmation_token.is_some()
        && ask.message.to_lowercase().contains("confirm");

    let Some(token) = ask.confirmation_token else {
        print_outcome('A', false);
        return Ok(false);
    };

    let done = shop.runtime.chat("scenario-a", Some(user), &format!("confirm {token}"))?;
    print_reply("After confirm", &done.message);

    let replay = shop.runtime.chat("scenario-a", Some(user), &format!("confirm {token}"))?;
    print_reply("After replay", &replay.message);

    let transactions = shop.runtime.store.transaction_count()?;
    println!();
    println!("  Transactions recorded: {transactions}");
    println!("  Audit chains intact:   {}", shop.runtime.audit.verify_integrity());

    let met = prompted
        && done.message.starts_with("Purchase confirmed.")
        && replay.message == TOKEN_ALREADY_USED
        && transactions == 1;
    print_outcome('A', met);
    Ok(met)
}
