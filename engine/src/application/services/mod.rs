//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application`, never from `crate::infra`.

pub mod compatibility;
pub mod container_start;
pub mod decision;
pub mod health_monitor;
pub mod lifecycle;

pub use compatibility::{Resolution, VersionReport, check_upgrade, resolve};
pub use container_start::{StartOutcome, start_container};
pub use decision::{DecideContext, decide};
pub use health_monitor::{HealthTarget, MonitorTask, monitor};
pub use lifecycle::{EngineDeps, EngineMessage, LifecycleEngine, Step};
