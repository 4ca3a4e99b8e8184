//! Scenario E: Purchase beyond available funds
//!
//! A user with 10.00 asks for a 350.99 keyboard. The policy engine denies
//! the plan before any tool runs or any token is issued.

use rust_decimal::Decimal;

use sentinel_contracts::error::SentinelResult;

use super::{print_outcome, print_reply, scenario_shop};

pub fn run_scenario() -> SentinelResult<bool> {
    println!("=== Scenario E: Insufficient funds ===");
    println!();

    let shop = scenario_shop(Decimal::new(1_000, 2))?;
    let keyboard = &shop.products[0];

    println!("  User balance: 10.00 USD");
    println!("  Product:      {} at {} {}", keyboard.name, keyboard.price, keyboard.currency);
    println!();

    let message = format!("buy product_id={} qty=1", keyboard.id);
    let reply = shop.runtime.chat("scenario-e", Some(shop.user.id.as_str()), &message)?;
    print_reply("Assistant", &reply.message);

    let issued = shop.runtime.ledger.len()?;
    let met = reply.message == "Cannot proceed: insufficient funds."
        && !reply.needs_confirmation
        && issued == 0;
    print_outcome('E', met);
    Ok(met)
}
