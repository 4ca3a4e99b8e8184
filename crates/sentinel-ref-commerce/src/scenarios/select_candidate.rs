//! Scenario C: Picking from a shown candidate list
//!
//! The session already holds three candidates. Replying "2" bypasses the
//! planner, selects the second candidate, and issues a confirmation for one
//! unit of it.

use rust_decimal::Decimal;

use sentinel_contracts::{error::SentinelResult, session::SessionMemory};
use sentinel_core::traits::SessionStore;

use super::{print_outcome, print_reply, scenario_shop};

pub fn run_scenario() -> SentinelResult<bool> {
    println!("=== Scenario C: Candidate selection ===");
    println!();

    let shop = scenario_shop(Decimal::new(200_000, 2))?;
    let memory = SessionMemory {
        candidates: shop.products.iter().map(|p| p.candidate()).collect(),
        ..SessionMemory::default()
    };
    shop.runtime.sessions.save("scenario-c", &memory)?;

    println!("  Candidates shown earlier:");
    for (i, p) in shop.products.iter().enumerate() {
        println!("    {}) {}", i + 1, p.name);
    }
    println!();

    let reply = shop.runtime.chat("scenario-c", Some(shop.user.id.as_str()), "2")?;
    print_reply("Assistant", &reply.message);

    let second = &shop.products[1];
    let selected = shop.runtime.sessions.load("scenario-c")?.selected_product_id;

    let met = reply.needs_confirmation
        && reply.message.contains(&format!("- Product: {}", second.name))
        && reply.message.contains("- Qty: 1")
        && selected.as_deref() == Some(second.id.as_str());
    print_outcome('C', met);
    Ok(met)
}
