//! # sentinel-audit
//!
//! Append-only, SHA-256 hash-chained audit trail and trace store for the
//! SentinelFlow runtime.
//!
//! ## Overview
//!
//! Every tool invocation the registry records is wrapped in an `AuditEvent`
//! that links to the previous event of the same trace via its SHA-256 hash.
//! Tampering with any event, even a single byte, breaks that trace's chain
//! and is detected by `verify_chain`.
//!
//! `InMemoryTraceStore` holds the per-turn traces. Deleting a trace purges
//! its audit chain. Its `sessions` and `timeline` queries list recent
//! sessions and replay one session turn by turn with its tool calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_audit::{InMemoryAuditTrail, InMemoryTraceStore};
//!
//! let trail = Arc::new(InMemoryAuditTrail::new());
//! let traces = InMemoryTraceStore::new(trail.clone());
//!
//! assert!(trail.verify_integrity());
//! let log = trail.export_trace(&trace_id)?;
//! ```

pub mod chain;
pub mod event;
pub mod traces;
pub mod trail;

pub use chain::{hash_event, verify_chain};
pub use event::{AuditEvent, TraceAuditLog};
pub use traces::{InMemoryTraceStore, SessionSummary, SessionTimeline, TimelineTurn};
pub use trail::InMemoryAuditTrail;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use sentinel_contracts::{
        plan::{AgentPlan, Intent, ToolName},
        trace::{AuditLogEntry, ToolCallStatus, TraceId},
    };
    use sentinel_core::traits::{AuditWriter, TraceStore};

    use super::{AuditEvent, InMemoryAuditTrail, InMemoryTraceStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build an entry with a distinguishable input.
    fn make_entry(trace_id: &TraceId, query: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: uuid::Uuid::new_v4(),
            trace_id: trace_id.clone(),
            tool_name: ToolName::SearchProducts,
            status: ToolCallStatus::Ok,
            input: json!({ "query": query, "limit": 5 }),
            output: Some(json!({ "results": [] })),
            error: None,
            created_at: Utc::now(),
        }
    }

    // ── Hash chain ────────────────────────────────────────────────────────────

    /// Writing entries to two traces keeps both chains valid.
    #[test]
    fn test_hash_chain_integrity() {
        let trail = InMemoryAuditTrail::new();
        let a = TraceId::new();
        let b = TraceId::new();
        trail.append(&make_entry(&a, "first")).unwrap();
        trail.append(&make_entry(&b, "other")).unwrap();
        trail.append(&make_entry(&a, "second")).unwrap();

        assert!(trail.verify_integrity(), "chains must be valid after sequential writes");
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.entries_for_trace(&a).unwrap().len(), 2);
    }

    /// Mutating a stored entry breaks its chain.
    #[test]
    fn test_tamper_detection() {
        let trail = InMemoryAuditTrail::new();
        let trace = TraceId::new();
        trail.append(&make_entry(&trace, "a")).unwrap();
        trail.append(&make_entry(&trace, "b")).unwrap();

        {
            let mut state = trail.state.lock().unwrap();
            let chain = state.chains.get_mut(&trace).unwrap();
            chain.events[0].entry.status = ToolCallStatus::Blocked;
        }

        assert!(!trail.verify_integrity(), "chain must detect tampering with a stored entry");
    }

    /// Each trace's chain starts at genesis with sequence 0.
    #[test]
    fn test_genesis_and_sequence_per_trace() {
        let trail = InMemoryAuditTrail::new();
        let a = TraceId::new();
        let b = TraceId::new();
        trail.append(&make_entry(&a, "a0")).unwrap();
        trail.append(&make_entry(&a, "a1")).unwrap();
        trail.append(&make_entry(&b, "b0")).unwrap();

        let log_a = trail.export_trace(&a).unwrap().unwrap();
        let log_b = trail.export_trace(&b).unwrap().unwrap();

        assert_eq!(log_a.events[0].prev_hash, AuditEvent::GENESIS_HASH);
        assert_eq!(log_b.events[0].prev_hash, AuditEvent::GENESIS_HASH);
        assert_eq!(log_a.events[1].sequence, 1);
        assert_eq!(log_a.events[1].prev_hash, log_a.events[0].this_hash);
        assert_eq!(log_a.terminal_hash, log_a.events[1].this_hash);
        assert!(super::verify_chain(&log_a.events));
    }

    /// Events moved between chains fail verification.
    #[test]
    fn test_foreign_event_breaks_chain() {
        let trail = InMemoryAuditTrail::new();
        let a = TraceId::new();
        let b = TraceId::new();
        trail.append(&make_entry(&a, "a0")).unwrap();
        trail.append(&make_entry(&b, "b0")).unwrap();

        let mut events = trail.export_trace(&a).unwrap().unwrap().events;
        events.extend(trail.export_trace(&b).unwrap().unwrap().events);

        assert!(!super::verify_chain(&events));
    }

    #[test]
    fn test_verify_empty() {
        assert!(InMemoryAuditTrail::new().verify_integrity());
        assert!(super::verify_chain(&[]));
        assert!(InMemoryAuditTrail::new().export_trace(&TraceId::new()).unwrap().is_none());
    }

    // ── Trace store ───────────────────────────────────────────────────────────

    #[test]
    fn test_recent_is_newest_first_and_session_scoped() {
        let store = InMemoryTraceStore::new(Arc::new(InMemoryAuditTrail::new()));
        let first = store.create("s1", "one").unwrap();
        store.create("s2", "elsewhere").unwrap();
        let second = store.create("s1", "two").unwrap();
        let third = store.create("s1", "three").unwrap();

        let recent = store.recent("s1", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, third.id);
        assert_eq!(recent[1].id, second.id);

        let all = store.recent("s1", 25).unwrap();
        assert_eq!(all.last().unwrap().id, first.id);
        assert_eq!(store.session_traces("s1").unwrap().len(), 3);
    }

    #[test]
    fn test_update_happens_once_and_keeps_plan() {
        let store = InMemoryTraceStore::new(Arc::new(InMemoryAuditTrail::new()));
        let trace = store.create("s1", "what is my balance").unwrap();
        let plan = AgentPlan::ask(Intent::CheckBalance, "What is your user_id?");

        store.update(&trace.id, "What is your user_id?", Some(&plan), None).unwrap();
        let stored = store.get(&trace.id).unwrap().unwrap();
        assert_eq!(stored.assistant_message.as_deref(), Some("What is your user_id?"));
        assert_eq!(stored.plan, Some(plan));

        assert!(store.update(&trace.id, "again", None, None).is_err());
        assert!(store.update(&TraceId::new(), "missing", None, None).is_err());
    }

    #[test]
    fn test_delete_cascades_to_audit_entries() {
        let trail = Arc::new(InMemoryAuditTrail::new());
        let store = InMemoryTraceStore::new(trail.clone());
        let doomed = store.create("s1", "search").unwrap();
        let kept = store.create("s1", "search again").unwrap();
        trail.append(&make_entry(&doomed.id, "desk")).unwrap();
        trail.append(&make_entry(&doomed.id, "lamp")).unwrap();
        trail.append(&make_entry(&kept.id, "chair")).unwrap();

        assert!(store.delete(&doomed.id).unwrap());

        assert!(store.get(&doomed.id).unwrap().is_none());
        assert!(trail.entries_for_trace(&doomed.id).unwrap().is_empty());
        assert_eq!(trail.entries_for_trace(&kept.id).unwrap().len(), 1);
        assert!(trail.verify_integrity());
        assert!(!store.delete(&doomed.id).unwrap());
    }

    // ── Timeline ──────────────────────────────────────────────────────────────

    #[test]
    fn test_sessions_are_distinct_and_most_recent_first() {
        let store = InMemoryTraceStore::new(Arc::new(InMemoryAuditTrail::new()));
        store.create("s1", "hello").unwrap();
        store.create("s2", "hi").unwrap();
        let last = store.create("s1", "again").unwrap();
        store.create("s3", "hey").unwrap();

        let sessions = store.sessions(50).unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s1", "s2"]);
        assert_eq!(sessions[1].last_activity, last.created_at);

        assert_eq!(store.sessions(2).unwrap().len(), 2);
        assert!(InMemoryTraceStore::new(Arc::new(InMemoryAuditTrail::new()))
            .sessions(50)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_timeline_is_chronological_with_audit_logs() {
        let trail = Arc::new(InMemoryAuditTrail::new());
        let store = InMemoryTraceStore::new(trail.clone());
        let first = store.create("s1", "find a lamp").unwrap();
        store.create("s2", "unrelated").unwrap();
        let second = store.create("s1", "what is my balance").unwrap();
        trail.append(&make_entry(&first.id, "lamp")).unwrap();
        trail.append(&make_entry(&first.id, "desk lamp")).unwrap();

        let plan = AgentPlan::ask(Intent::CheckBalance, "What is your user_id?");
        store.update(&second.id, "What is your user_id?", Some(&plan), None).unwrap();

        let timeline = store.timeline("s1", 200).unwrap();
        assert_eq!(timeline.session_id, "s1");
        assert_eq!(timeline.turns.len(), 2);
        assert_eq!(timeline.turns[0].trace.id, first.id);
        assert_eq!(timeline.turns[0].audit_logs.len(), 2);
        assert_eq!(timeline.turns[0].audit_logs[1].input["query"], "desk lamp");
        assert_eq!(timeline.turns[1].trace.plan, Some(plan));
        assert!(timeline.turns[1].audit_logs.is_empty());

        let latest = store.timeline("s1", 1).unwrap();
        assert_eq!(latest.turns.len(), 1);
        assert_eq!(latest.turns[0].trace.id, second.id);

        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["turns"][0]["user_message"], "find a lamp");
        assert_eq!(json["turns"][0]["audit_logs"][0]["tool_name"], "search_products");

        assert!(store.timeline("nobody", 200).unwrap().turns.is_empty());
    }
}
