//! # sentinel-contracts
//!
//! Shared types, schemas, and contracts for the SentinelFlow agent runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, wire conversions, and error types.

pub mod chat;
pub mod commerce;
pub mod error;
pub mod ledger;
pub mod plan;
pub mod policy;
pub mod session;
pub mod tool_io;
pub mod trace;
pub mod verify;
