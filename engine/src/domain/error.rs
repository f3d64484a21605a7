//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Version errors ────────────────────────────────────────────────────────────

/// Errors raised by strict version parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("'{version}' is not a valid version: {reason}")]
    Unparsable { version: String, reason: String },
}

// ── Runtime driver errors ─────────────────────────────────────────────────────

/// Failure of `RuntimeDriver::run_container`.
///
/// Carries the command line the driver attempted so the message shown to the
/// user always names what was run. `message` is the raw runtime error and may
/// contain an `"\nOutput:"` section with captured process output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RunContainerError {
    /// Argument vector of the attempted command.
    pub command: Vec<String>,
    /// Raw error text reported by the runtime.
    pub message: String,
}

impl RunContainerError {
    /// The attempted command joined with spaces.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Whether the runtime refused because the container name is taken.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.message.contains("already exists") || self.message.contains("exists:")
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to engine configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Terminal failures of the initialization flow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Initialization cancelled")]
    Cancelled,

    #[error("Command failed - check output above for details")]
    StreamFailed,

    #[error("Image {image} is still missing after a successful {step}")]
    ImageStillMissing { image: String, step: &'static str },

    #[error("Failed to create {what} command: {reason}")]
    CommandUnavailable { what: &'static str, reason: String },

    #[error("Container failed during startup - check logs below for details")]
    Unhealthy,
}
