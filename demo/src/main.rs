//! SentinelFlow Commerce Reference Runtime: Demo CLI
//!
//! Seeds a synthetic shop and lets you talk to the orchestrator, or runs the
//! five reference scenarios end to end.
//!
//! Usage:
//!   cargo run -p demo -- chat --user <user_id>
//!   cargo run -p demo -- chat --planner oracle --config sentinel.toml
//!   cargo run -p demo -- scenarios
//!   cargo run -p demo -- seed --users 3 --products 8
//!   cargo run -p demo -- timeline --script session.txt
//!   cargo run -p demo -- eval --cases cases.jsonl --modes rules,oracle

mod config;
mod replay;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentinel_contracts::error::{SentinelError, SentinelResult};
use sentinel_planner::{build_planner, PlannerMode};
use sentinel_ref_commerce::{
    eval, scenarios, seed_synthetic_data, CommerceStore, ReferenceRuntime,
};

use crate::config::AppConfig;

const QUIT_WORDS: [&str; 3] = ["quit", "exit", "/quit"];
const SESSION_LIST_LIMIT: usize = 50;
const TIMELINE_LIMIT: usize = 200;

// ── CLI definition ────────────────────────────────────────────────────────────

/// SentinelFlow: policy-gated conversational commerce demo.
///
/// Every purchase passes through the purchase policy and a single-use
/// confirmation token before it executes, and every tool call is written to
/// a SHA-256 hash-chained audit trail.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "SentinelFlow commerce reference runtime demo",
    long_about = "Chat with the SentinelFlow orchestrator over a seeded in-memory shop,\n\
                  or run the reference scenarios showing confirmation gating,\n\
                  policy denials, and audit chain integrity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed a shop and chat with the orchestrator on stdin.
    Chat {
        /// Session id for this conversation.
        #[arg(long, default_value = "demo-session")]
        session: String,
        /// Authenticated user id. Without one the assistant asks for it.
        #[arg(long)]
        user: Option<String>,
        /// Plan generator: rules or oracle. Overrides the config file.
        #[arg(long)]
        planner: Option<PlannerMode>,
        /// TOML file with [planner], [policy], and [orchestrator] tables.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Users to seed.
        #[arg(long, default_value_t = 5)]
        users: usize,
        /// Products to seed.
        #[arg(long, default_value_t = 8)]
        products: usize,
    },
    /// Run the five reference scenarios in sequence.
    Scenarios,
    /// Seed a fresh shop and print its users and catalogue.
    Seed {
        #[arg(long, default_value_t = 5)]
        users: usize,
        #[arg(long, default_value_t = 8)]
        products: usize,
    },
    /// Replay a script of messages, then print the session list and the
    /// session's timeline of traces and tool calls.
    Timeline {
        /// One message per line. `<PRODUCT_ID>` and `<TOKEN>` are expanded.
        #[arg(long)]
        script: PathBuf,
        #[arg(long, default_value = "demo-session")]
        session: String,
        /// Send the messages without a user id.
        #[arg(long)]
        anonymous: bool,
        /// Print the timeline as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Run evaluation cases through each planner mode and summarize.
    Eval {
        /// JSONL case file. Defaults to the bundled cases.
        #[arg(long)]
        cases: Option<PathBuf>,
        /// Comma-separated planner modes to run.
        #[arg(long, value_delimiter = ',', default_value = "rules,oracle")]
        modes: Vec<PlannerMode>,
        /// TOML file whose [planner] table configures the oracle.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the full report as JSON after the summary.
        #[arg(long)]
        json: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::Chat { session, user, planner, config, users, products } => {
            run_chat(&session, user.as_deref(), planner, config, users, products)
        }
        Command::Scenarios => run_scenarios(),
        Command::Seed { users, products } => run_seed(users, products),
        Command::Timeline { script, session, anonymous, json } => {
            run_timeline(&script, &session, anonymous, json)
        }
        Command::Eval { cases, modes, config, json } => run_eval(cases, &modes, config, json),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

fn run_chat(
    session: &str,
    user: Option<&str>,
    planner: Option<PlannerMode>,
    config_path: Option<PathBuf>,
    users: usize,
    products: usize,
) -> SentinelResult<()> {
    let mut config = match config_path {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };
    if let Some(mode) = planner {
        config.planner.mode = mode;
    }

    let store = Arc::new(CommerceStore::new());
    seed_synthetic_data(&store, users, products)?;
    print_shop(&store)?;

    let runtime = ReferenceRuntime::new(
        store,
        build_planner(&config.planner),
        config.policy,
        config.orchestrator,
    );
    info!(session_id = %session, planner = %config.planner.mode, "chat started");

    match user {
        Some(user) => println!("Chatting as {user} in session {session}."),
        None => println!("Chatting without a user id in session {session}. Pass --user to set one."),
    }
    println!("Type a message, `/sessions`, `/timeline`, or `quit` to leave.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }
        match message {
            "/sessions" => {
                replay::print_sessions(&runtime, SESSION_LIST_LIMIT)?;
                continue;
            }
            "/timeline" => {
                replay::print_timeline(&runtime.traces.timeline(session, TIMELINE_LIMIT)?);
                continue;
            }
            _ => {}
        }

        let reply = runtime.chat(session, user, message)?;
        for line in reply.message.lines() {
            println!("bot> {line}");
        }
        if let Some(token) = reply.confirmation_token {
            println!("     [awaiting confirmation: {token}]");
        }
        println!();
    }

    println!(
        "Audit events: {}  Chains intact: {}",
        runtime.audit.len(),
        runtime.audit.verify_integrity()
    );
    Ok(())
}

fn run_scenarios() -> SentinelResult<()> {
    let met = scenarios::run_all()?;
    println!("{met} of 5 scenarios met their expected outcome.");
    if met < 5 {
        std::process::exit(2);
    }
    Ok(())
}

fn run_seed(users: usize, products: usize) -> SentinelResult<()> {
    let store = CommerceStore::new();
    let summary = seed_synthetic_data(&store, users, products)?;
    print_shop(&store)?;
    println!(
        "Seeded {} users and {} products.",
        summary.users_created, summary.products_created
    );
    Ok(())
}

fn run_timeline(script: &Path, session: &str, anonymous: bool, json: bool) -> SentinelResult<()> {
    let text = std::fs::read_to_string(script)?;

    let store = Arc::new(CommerceStore::new());
    seed_synthetic_data(&store, 3, 8)?;
    let snapshot = store.snapshot()?;
    let (Some(user), Some(product)) = (snapshot.users.first(), snapshot.products.first()) else {
        return Err(SentinelError::Config { reason: "seeded shop is empty".to_string() });
    };
    let user = (!anonymous).then_some(user.id.as_str());

    let runtime = ReferenceRuntime::with_rules(store);
    let sent = replay::replay(&runtime, session, user, &product.id, &text)?;
    info!(session_id = %session, messages = sent, "script replayed");

    let timeline = runtime.traces.timeline(session, TIMELINE_LIMIT)?;
    if json {
        let rendered = serde_json::to_string_pretty(&timeline).map_err(|e| SentinelError::Storage {
            reason: format!("timeline encoding: {e}"),
        })?;
        println!("{rendered}");
        return Ok(());
    }
    replay::print_sessions(&runtime, SESSION_LIST_LIMIT)?;
    replay::print_timeline(&timeline);
    println!(
        "Audit events: {}  Chains intact: {}",
        runtime.audit.len(),
        runtime.audit.verify_integrity()
    );
    Ok(())
}

fn run_eval(
    cases_path: Option<PathBuf>,
    modes: &[PlannerMode],
    config_path: Option<PathBuf>,
    json: bool,
) -> SentinelResult<()> {
    let text = match cases_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => eval::DEFAULT_CASES.to_string(),
    };
    let cases = eval::parse_cases(&text)?;
    let config = match config_path {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };

    let report = eval::run_eval(&cases, modes, &config.planner)?;
    println!("{}", report.render());
    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| SentinelError::Storage {
            reason: format!("report encoding: {e}"),
        })?;
        println!();
        println!("{rendered}");
    }
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_shop(store: &CommerceStore) -> SentinelResult<()> {
    let snapshot = store.snapshot()?;

    println!("Users:");
    for user in &snapshot.users {
        let balance = snapshot
            .accounts
            .iter()
            .find(|a| a.user_id == user.id)
            .map(|a| format!("{} {}", a.balance, a.currency))
            .unwrap_or_default();
        println!("  {}  {:<14} {}", user.id, user.full_name, balance);
    }
    println!();

    println!("Products:");
    for product in &snapshot.products {
        println!(
            "  {}  {:<28} {:>8} {}  stock {}",
            product.id, product.name, product.price, product.currency, product.inventory_qty
        );
    }
    println!();
    Ok(())
}

fn print_banner() {
    println!();
    println!("SentinelFlow: Policy-gated Conversational Commerce");
    println!("Reference Runtime Demo");
    println!("===================================================");
    println!();
    println!("SentinelFlow pipeline per turn:");
    println!("  [1] `confirm <token>` replies go to the confirmation ledger first");
    println!("  [2] Numbered replies pick from the last candidate list");
    println!("  [3] Otherwise the planner proposes a plan (rules, or oracle with fallback)");
    println!("  [4] Purchase policy checks identity, the single-purchase ceiling, and funds");
    println!("  [5] Purchases wait for a single-use token; every tool call is hash-chain audited");
    println!();
}
