//! # sentinel-core
//!
//! The per-turn runtime for SentinelFlow agents.
//!
//! This crate provides:
//! - The trust-boundary traits (`PlanGenerator`, `PolicyEngine`, `AuditWriter`,
//!   the stores, and the commerce services)
//! - The four backend tools and the audited `ToolRegistry`
//! - The selection resolver and token generation
//! - The `Orchestrator` that wires them together in the correct order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_core::{Orchestrator, Stores, ToolRegistry, OrchestratorConfig};
//!
//! let orchestrator = Orchestrator::new(planner, policy, registry, stores, OrchestratorConfig::default());
//! let response = orchestrator.handle_message(&request)?;
//! ```

pub mod config;
pub mod ids;
pub mod orchestrator;
pub mod payments;
pub mod registry;
pub mod resolver;
pub mod tools;
pub mod traits;

pub use config::OrchestratorConfig;
pub use orchestrator::{Orchestrator, Stores};
pub use registry::{ToolOutcome, ToolRegistry};
