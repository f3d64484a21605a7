//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution with
//! streamed output, pseudo-terminals, network probes, and config persistence.
//! The container runtime driver itself is supplied by the embedding program.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.

pub mod config;
pub mod probe;
#[cfg(unix)]
mod pty;
pub mod streaming;

pub use config::YamlConfigStore;
pub use probe::{HttpVersionProbe, TcpPortProbe};
pub use streaming::{TokioProcessSpawner, execute_piped, execute_tty};
