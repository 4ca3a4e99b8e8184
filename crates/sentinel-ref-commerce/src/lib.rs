//! # sentinel-ref-commerce
//!
//! In-memory commerce backend and reference runtime for SentinelFlow.
//!
//! `CommerceStore` implements the account, catalog, and transaction services
//! behind one lock. Each service call is atomic on its own, but the debit,
//! reservation, and insert of one purchase are separate calls and may
//! interleave with another purchase. The unique `(user, idempotency_key)`
//! insert is what stops a duplicate charge. `InMemorySessionStore` and
//! `InMemoryConfirmationLedger` complete the persistence seams, and
//! `ReferenceRuntime` wires all of them to an orchestrator.
//!
//! The `scenarios` module drives five conversations end to end:
//!
//! 1. **Purchase by product id**: confirmation required, token executes once.
//! 2. **Balance check without identity**: the planner asks for a user id.
//! 3. **Candidate selection**: replying "2" picks from a shown list.
//! 4. **Unknown confirmation token**: refused with no side effects.
//! 5. **Insufficient funds**: denied by policy before any tool runs.
//!
//! The `eval` module replays a JSONL case file through the rules and oracle
//! planners and reports pass rate and p95 latency.
//!
//! All data is synthetic. No external calls are made unless the runtime is
//! built with the oracle planner.

pub mod eval;
pub mod memory;
pub mod runtime;
pub mod scenarios;
pub mod seed;
pub mod store;

pub use memory::{InMemoryConfirmationLedger, InMemorySessionStore};
pub use runtime::ReferenceRuntime;
pub use seed::{seed_synthetic_data, seed_with_rng, SeedSummary, PRODUCT_CATALOGUE};
pub use store::{CommerceStore, ShopSnapshot};
