//! Runtime error types for the SentinelFlow pipeline.
//!
//! Policy denials and tool failures are values, not errors. What remains here
//! are faults the caller cannot turn into a user-facing answer by itself:
//! storage, configuration, and untrusted-input rejections that trigger a
//! fallback path.

use thiserror::Error;

use crate::commerce::CommerceError;

/// The unified error type for the SentinelFlow runtime.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// A payload did not satisfy the plan JSON Schema.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// A structurally valid plan broke a semantic plan rule.
    #[error("plan rejected: {reason}")]
    PlanRejected { reason: String },

    /// The external plan oracle failed (transport, status, or empty output).
    #[error("plan oracle failed: {reason}")]
    Oracle { reason: String },

    /// A store could not read or persist a record.
    #[error("storage failure: {reason}")]
    Storage { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The registry has no handler for the requested tool.
    #[error("tool '{tool}' is not registered")]
    ToolNotRegistered { tool: String },

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Console or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the SentinelFlow crates.
pub type SentinelResult<T> = Result<T, SentinelError>;
