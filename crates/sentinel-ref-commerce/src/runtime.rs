//! A fully wired SentinelFlow runtime over the in-memory backend.

use std::sync::Arc;

use tracing::info;

use sentinel_audit::{InMemoryAuditTrail, InMemoryTraceStore};
use sentinel_contracts::{
    chat::{ChatRequest, ChatResponse},
    error::SentinelResult,
};
use sentinel_core::{
    traits::{CommerceServices, PlanGenerator},
    Orchestrator, OrchestratorConfig, Stores, ToolRegistry,
};
use sentinel_planner::RulePlanner;
use sentinel_policy::{PolicyLimits, PurchasePolicyEngine};

use crate::{
    memory::{InMemoryConfirmationLedger, InMemorySessionStore},
    store::CommerceStore,
};

/// The orchestrator plus handles on every store it writes to.
pub struct ReferenceRuntime {
    pub store: Arc<CommerceStore>,
    pub audit: Arc<InMemoryAuditTrail>,
    pub traces: Arc<InMemoryTraceStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub ledger: Arc<InMemoryConfirmationLedger>,
    orchestrator: Orchestrator,
}

impl ReferenceRuntime {
    /// Wire a runtime around `store` with the given planner and limits.
    pub fn new(
        store: Arc<CommerceStore>,
        planner: Box<dyn PlanGenerator>,
        limits: PolicyLimits,
        config: OrchestratorConfig,
    ) -> Self {
        let audit = Arc::new(InMemoryAuditTrail::new());
        let traces = Arc::new(InMemoryTraceStore::new(audit.clone()));
        let sessions = Arc::new(InMemorySessionStore::new());
        let ledger = Arc::new(InMemoryConfirmationLedger::new());

        let services = CommerceServices {
            accounts: store.clone(),
            catalog: store.clone(),
            transactions: store.clone(),
        };
        info!(
            ledger_window = config.ledger_window,
            ceiling = %limits.max_single_purchase,
            "reference runtime ready"
        );
        let policy = PurchasePolicyEngine::new(limits, store.clone(), store.clone());
        let registry = ToolRegistry::standard(services, audit.clone());
        let stores = Stores {
            traces: traces.clone(),
            sessions: sessions.clone(),
            ledger: ledger.clone(),
        };

        let orchestrator = Orchestrator::new(planner, Box::new(policy), registry, stores, config);

        Self { store, audit, traces, sessions, ledger, orchestrator }
    }

    /// Rule planner, default limits, default orchestrator settings.
    pub fn with_rules(store: Arc<CommerceStore>) -> Self {
        Self::new(
            store,
            Box::new(RulePlanner::new()),
            PolicyLimits::default(),
            OrchestratorConfig::default(),
        )
    }

    pub fn chat(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        message: &str,
    ) -> SentinelResult<ChatResponse> {
        self.orchestrator
            .handle_message(&ChatRequest::new(session_id, user_id, message))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Clear traces, audit chains, session memory, and the ledger. The
    /// commerce data is left alone.
    pub fn clear_history(&self) -> SentinelResult<()> {
        self.traces.clear()?;
        self.sessions.clear()?;
        self.ledger.clear()
    }
}
