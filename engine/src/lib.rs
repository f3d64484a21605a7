//! Container lifecycle engine for catnip workspaces.
//!
//! Given a [`LifecycleRequest`](domain::request::LifecycleRequest), the
//! [`LifecycleEngine`](application::services::LifecycleEngine) decides
//! whether to pull, build, start or reuse a container, streams the output of
//! whatever it runs, and watches the container until it is healthy.
//!
//! The container runtime itself is reached through the
//! [`RuntimeDriver`](application::ports::RuntimeDriver) port, supplied by the
//! embedding program.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod application;
pub mod args;
pub mod domain;
pub mod infra;
pub mod logging;
