//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`.

pub mod cancel;
pub mod ports;
pub mod services;
pub mod stream;
pub mod timed;

pub use cancel::CancelFlag;
pub use ports::{
    CommandSpec, ConfigStore, PortProbe, ProcessSpawner, RunSpec, RunningContainer,
    RuntimeDriver, VersionProbe,
};
pub use stream::{ProcessHandle, ReadOutcome, StreamingTask};
