//! Script replay and the session timeline printout.
//!
//! A script is one user message per line. Blank lines and `#` comments are
//! skipped. `<PRODUCT_ID>` expands to the first seeded product and `<TOKEN>`
//! to the most recent confirmation token the assistant issued.

use sentinel_audit::SessionTimeline;
use sentinel_contracts::{error::SentinelResult, ledger::ConfirmationToken};
use sentinel_ref_commerce::ReferenceRuntime;

pub const PRODUCT_PLACEHOLDER: &str = "<PRODUCT_ID>";
pub const TOKEN_PLACEHOLDER: &str = "<TOKEN>";

/// The messages of `script` with placeholders still in place.
pub fn script_messages(script: &str) -> Vec<&str> {
    script
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}

pub fn substitute(message: &str, product_id: &str, last_token: Option<&ConfirmationToken>) -> String {
    let message = message.replace(PRODUCT_PLACEHOLDER, product_id);
    match last_token {
        Some(token) => message.replace(TOKEN_PLACEHOLDER, token.as_str()),
        None => message,
    }
}

/// Send every script line to `session`, echoing the exchange.
pub fn replay(
    runtime: &ReferenceRuntime,
    session: &str,
    user: Option<&str>,
    product_id: &str,
    script: &str,
) -> SentinelResult<usize> {
    let mut last_token = None;
    let mut sent = 0;
    for line in script_messages(script) {
        let message = substitute(line, product_id, last_token.as_ref());
        println!("you> {message}");
        let reply = runtime.chat(session, user, &message)?;
        for line in reply.message.lines() {
            println!("bot> {line}");
        }
        println!();
        if reply.confirmation_token.is_some() {
            last_token = reply.confirmation_token;
        }
        sent += 1;
    }
    Ok(sent)
}

pub fn print_sessions(runtime: &ReferenceRuntime, limit: usize) -> SentinelResult<()> {
    let sessions = runtime.traces.sessions(limit)?;
    println!("Sessions:");
    if sessions.is_empty() {
        println!("  (none)");
    }
    for s in &sessions {
        println!("  {:<24} last active {}", s.session_id, s.last_activity.to_rfc3339());
    }
    println!();
    Ok(())
}

pub fn print_timeline(timeline: &SessionTimeline) {
    println!("Timeline of {} ({} turns):", timeline.session_id, timeline.turns.len());
    for turn in &timeline.turns {
        let trace = &turn.trace;
        println!();
        println!("  [{}] trace {}", trace.created_at.to_rfc3339(), trace.id);
        println!("    user:      {}", trace.user_message);
        if let Some(reply) = &trace.assistant_message {
            let first = reply.lines().next().unwrap_or_default();
            println!("    assistant: {first}");
        }
        if let Some(plan) = &trace.plan {
            println!("    plan:      {:?}, {} steps, risk {:?}", plan.intent, plan.steps.len(), plan.risk_level);
        }
        if let Some(pending) = &trace.pending_confirmation {
            println!("    pending:   token {}", pending.token);
        }
        for entry in &turn.audit_logs {
            println!("    tool:      {} {:?} {}", entry.tool_name, entry.status, entry.input);
            if let Some(error) = &entry.error {
                println!("               error: {error}");
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_skips_blanks_and_comments() {
        let script = "# open with a balance check\nwhat is my balance\n\n  buy product_id=<PRODUCT_ID>  \n";
        assert_eq!(script_messages(script), vec!["what is my balance", "buy product_id=<PRODUCT_ID>"]);
    }

    #[test]
    fn test_substitute_placeholders() {
        let token = ConfirmationToken("tok-1".to_string());
        assert_eq!(
            substitute("buy product_id=<PRODUCT_ID> qty=2", "p-42", None),
            "buy product_id=p-42 qty=2"
        );
        assert_eq!(substitute("confirm <TOKEN>", "p-42", Some(&token)), "confirm tok-1");
        assert_eq!(substitute("confirm <TOKEN>", "p-42", None), "confirm <TOKEN>");
    }
}
