//! Domain layer: pure lifecycle logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod classify;
pub mod compat;
pub mod config;
pub mod error;
pub mod health;
pub mod phase;
pub mod request;
pub mod runtime;
pub mod version;

pub use classify::{
    ClassifiedError, ErrorCategory, classify, describe_failure, extract_output, format_generic,
};
pub use compat::{CompatibilityVerdict, must_recreate, verdict};
pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, RunContainerError, VersionError};
pub use health::{HealthOutcome, HealthPolicy, HealthState, UnhealthyReason};
pub use phase::{Action, Completion, Decision, LifecycleEvent, LifecyclePhase, transition};
pub use request::{LifecycleRequest, ResourceLimits};
pub use runtime::ContainerRuntime;
pub use version::{compare_versions, parse_strict};
