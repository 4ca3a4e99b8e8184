//! Scenario B: Balance check without identity
//!
//! Without a user id the planner asks for one instead of guessing. No tool
//! runs, so the turn leaves no audit entry.

use sentinel_contracts::error::SentinelResult;
use sentinel_core::traits::AuditWriter;
use sentinel_planner::rules::ASK_USER_ID;

use super::{print_outcome, print_reply, scenario_shop};

pub fn run_scenario() -> SentinelResult<bool> {
    println!("=== Scenario B: Balance check without identity ===");
    println!();

    let shop = scenario_shop(rust_decimal::Decimal::new(100_000, 2))?;

    let reply = shop.runtime.chat("scenario-b", None, "what is my balance")?;
    print_reply("Assistant", &reply.message);

    let audited = shop.runtime.audit.entries_for_trace(&reply.trace_id)?.len();
    println!();
    println!("  Audit entries for this turn: {audited}");

    let met = reply.message == ASK_USER_ID && !reply.needs_confirmation && audited == 0;
    print_outcome('B', met);
    Ok(met)
}
