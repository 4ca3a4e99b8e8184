//! Core trait definitions for the SentinelFlow pipeline.
//!
//! These traits define the trust boundary around one user turn:
//!
//! - `PlanGenerator`      untrusted logic (may be backed by an external model)
//! - `PolicyEngine`       trusted gate, evaluated before any tool runs
//! - `AuditWriter`        trusted sink, one entry per tool invocation attempt
//! - `TraceStore`         per-turn record, the audit anchor
//! - `SessionStore`       last-value-wins resolution state
//! - `ConfirmationLedger` single-use tokens gating purchases
//!
//! plus the account, catalog, and transaction services the tools call into.
//! The orchestrator wires them together in the correct order.

use std::sync::Arc;

use rust_decimal::Decimal;

use sentinel_contracts::{
    commerce::{Account, CommerceError, Product, Transaction},
    error::SentinelResult,
    ledger::{LedgerEntry, PendingConfirmation},
    plan::AgentPlan,
    policy::PolicyDecision,
    session::SessionMemory,
    trace::{AuditLogEntry, Trace, TraceId},
};

/// Produces a candidate plan for one message.
///
/// Implementations are **untrusted**. Generation is infallible from the
/// caller's point of view: a generator backed by an unreliable source must
/// absorb its own failures and fall back to a deterministic plan.
pub trait PlanGenerator: Send + Sync {
    fn generate(&self, message: &str, user_id: Option<&str>) -> AgentPlan;
}

/// The policy engine: the gate in front of every tool call.
///
/// Implementations are **trusted** and must be deterministic given the state
/// of the services they read. A denial is returned as a `PolicyDecision`,
/// never as an `Err`.
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, plan: &AgentPlan, user_id: Option<&str>) -> SentinelResult<PolicyDecision>;
}

/// The append-only audit trail.
///
/// Every tool invocation attempt produces exactly one entry, regardless of
/// outcome. Entries are never modified; they disappear only when their
/// owning trace is deleted.
pub trait AuditWriter: Send + Sync {
    fn append(&self, entry: &AuditLogEntry) -> SentinelResult<()>;

    /// All entries for one trace, in append order.
    fn entries_for_trace(&self, trace_id: &TraceId) -> SentinelResult<Vec<AuditLogEntry>>;

    /// Remove every entry owned by `trace_id`. Returns how many were removed.
    fn purge_trace(&self, trace_id: &TraceId) -> SentinelResult<usize>;
}

/// Storage for per-turn traces.
pub trait TraceStore: Send + Sync {
    fn create(&self, session_id: &str, user_message: &str) -> SentinelResult<Trace>;

    /// Record the outcome of a turn. Allowed once per trace.
    fn update(
        &self,
        trace_id: &TraceId,
        assistant_message: &str,
        plan: Option<&AgentPlan>,
        pending: Option<&PendingConfirmation>,
    ) -> SentinelResult<()>;

    fn get(&self, trace_id: &TraceId) -> SentinelResult<Option<Trace>>;

    /// The `limit` most recent traces of a session, newest first.
    fn recent(&self, session_id: &str, limit: usize) -> SentinelResult<Vec<Trace>>;

    /// Delete a trace and, with it, its audit entries.
    fn delete(&self, trace_id: &TraceId) -> SentinelResult<bool>;
}

pub trait SessionStore: Send + Sync {
    /// Current memory for a session; empty if the session is new.
    fn load(&self, session_id: &str) -> SentinelResult<SessionMemory>;
    fn save(&self, session_id: &str, memory: &SessionMemory) -> SentinelResult<()>;
}

/// Token-indexed store of pending confirmations.
pub trait ConfirmationLedger: Send + Sync {
    fn issue(
        &self,
        session_id: &str,
        trace_id: &TraceId,
        pending: PendingConfirmation,
    ) -> SentinelResult<()>;

    /// Look up an entry by token within a session, in any state.
    fn find(&self, session_id: &str, token: &str) -> SentinelResult<Option<LedgerEntry>>;

    /// Atomically move an entry from `Issued` to `Consumed`.
    ///
    /// Returns the consumed entry, or `None` if the token is unknown or was
    /// already consumed. Of two concurrent callers exactly one gets `Some`.
    fn consume(&self, token: &str) -> SentinelResult<Option<LedgerEntry>>;
}

// ── Commerce services ────────────────────────────────────────────────────────

pub trait AccountService: Send + Sync {
    fn account(&self, user_id: &str) -> Result<Account, CommerceError>;

    /// Subtract `amount` and return the new balance.
    fn debit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, CommerceError>;
}

pub trait CatalogService: Send + Sync {
    /// An active product by id.
    fn product(&self, product_id: &str) -> Result<Product, CommerceError>;

    /// Decrement inventory, failing if fewer than `qty` units remain.
    fn reserve(&self, product_id: &str, qty: u32) -> Result<(), CommerceError>;

    /// Active products whose name or description contains any of `tokens`,
    /// most stocked first.
    fn search(&self, tokens: &[String], limit: usize) -> Result<Vec<Product>, CommerceError>;

    /// Unit price and currency, provided `qty` units are in stock.
    fn check_available(&self, product_id: &str, qty: u32) -> Result<(Decimal, String), CommerceError> {
        let product = self.product(product_id)?;
        if qty == 0 {
            return Err(CommerceError::InvalidQuantity);
        }
        if product.inventory_qty < qty {
            return Err(CommerceError::OutOfStock {
                product_id: product.id,
                requested: qty,
                available: product.inventory_qty,
            });
        }
        Ok((product.price, product.currency))
    }
}

pub trait TransactionStore: Send + Sync {
    fn find_by_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, CommerceError>;

    /// Insert a transaction. If `(user_id, idempotency_key)` already exists the
    /// existing row is returned and nothing is written.
    fn insert(&self, tx: Transaction) -> Result<Transaction, CommerceError>;
}

/// The service handles the tools and the policy engine read from.
#[derive(Clone)]
pub struct CommerceServices {
    pub accounts: Arc<dyn AccountService>,
    pub catalog: Arc<dyn CatalogService>,
    pub transactions: Arc<dyn TransactionStore>,
}
