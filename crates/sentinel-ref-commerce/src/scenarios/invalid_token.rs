//! Scenario D: Confirming a token that was never issued
//!
//! The reply is refused with no side effects beyond the turn's own trace:
//! no transaction and no audit entry.

use rust_decimal::Decimal;

use sentinel_contracts::error::SentinelResult;
use sentinel_core::{orchestrator::INVALID_TOKEN, traits::AuditWriter};

use super::{print_outcome, print_reply, scenario_shop};

pub fn run_scenario() -> SentinelResult<bool> {
    println!("=== Scenario D: Unknown confirmation token ===");
    println!();

    let shop = scenario_shop(Decimal::new(500_000, 2))?;

    let reply = shop.runtime.chat("scenario-d", Some(shop.user.id.as_str()), "confirm badtoken123")?;
    print_reply("Assistant", &reply.message);

    let transactions = shop.runtime.store.transaction_count()?;
    let audited = shop.runtime.audit.entries_for_trace(&reply.trace_id)?.len();
    println!();
    println!("  Transactions recorded: {transactions}");
    println!("  Audit entries:         {audited}");

    let met = reply.message == INVALID_TOKEN
        && !reply.needs_confirmation
        && transactions == 0
        && audited == 0;
    print_outcome('D', met);
    Ok(met)
}
