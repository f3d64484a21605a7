//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the application's own
//! stream primitives, never from `crate::infra`.
//!
//! The runtime-facing ports are `Send + Sync` with boxed `Send` futures
//! (`async_trait`) because the engine calls them from background tasks.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::application::stream::{ProcessHandle, StreamingTask};
use crate::domain::config::EngineConfig;
use crate::domain::error::RunContainerError;
use crate::domain::phase::Completion;
use crate::domain::request::ResourceLimits;
use crate::domain::runtime::ContainerRuntime;

// ── Value Types ───────────────────────────────────────────────────────────────

/// An external command the engine should run, as plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Working directory; inherits the engine's when `None`.
    pub dir: Option<PathBuf>,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Parameters for creating and starting the workspace container.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)] // mirrors the runtime's independent flags
pub struct RunSpec<'a> {
    pub image: &'a str,
    pub name: &'a str,
    pub source_root: &'a Path,
    /// `host:container` port mappings.
    pub ports: &'a [String],
    pub dev_mode: bool,
    pub ssh_enabled: bool,
    /// Remove an existing stopped container with the same name first.
    pub force_remove: bool,
    pub limits: ResourceLimits,
    /// `KEY=VALUE` entries.
    pub env_vars: &'a [String],
    pub dind: bool,
}

/// A running container that belongs to this tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    pub name: String,
    pub image: String,
}

// ── Runtime Driver Port ───────────────────────────────────────────────────────

/// Image and container primitives of the container runtime.
///
/// Boolean queries swallow their own errors: "cannot tell" reads as `false`.
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    /// Which runtime family this driver talks to.
    fn runtime(&self) -> ContainerRuntime;
    /// Whether `image` is present locally.
    async fn image_exists(&self, image: &str) -> bool;
    /// Command that pulls `image`, streaming progress to its terminal.
    async fn pull_image(&self, image: &str) -> Result<CommandSpec>;
    /// Command that builds the development image from `source_root`.
    async fn build_dev_image(&self, source_root: &Path) -> Result<CommandSpec>;
    /// Create (or reuse) and start the container.
    ///
    /// Returns the command line that was executed.
    ///
    /// # Errors
    ///
    /// Returns a [`RunContainerError`] carrying the attempted command and the
    /// raw runtime error, which may contain an `"\nOutput:"` section.
    async fn run_container(&self, spec: &RunSpec<'_>) -> Result<Vec<String>, RunContainerError>;
    /// Start an existing stopped container.
    async fn start_container(&self, name: &str) -> Result<()>;
    /// Stop a running container.
    async fn stop_container(&self, name: &str) -> Result<()>;
    /// Remove a stopped container.
    async fn remove_container(&self, name: &str) -> Result<()>;
    /// Whether a container named `name` is running.
    async fn is_container_running(&self, name: &str) -> bool;
    /// Whether a container named `name` exists in any state.
    async fn container_exists(&self, name: &str) -> bool;
    /// Image reference the container named `name` was created from.
    async fn container_image(&self, name: &str) -> Result<String>;
    /// Command that prints (and with `follow`, tails) the container's logs.
    async fn container_logs(&self, name: &str, follow: bool) -> Result<CommandSpec>;
    /// Any running container that belongs to this tool, whatever its name.
    async fn find_running_catnip_container(&self) -> Option<RunningContainer>;
}

// ── Process Port ──────────────────────────────────────────────────────────────

/// Starts external commands with their output streamed back.
pub trait ProcessSpawner: Send + Sync {
    /// Run on a pseudo-terminal; raw chunks, left running if the task is dropped.
    fn spawn_tty(&self, spec: &CommandSpec) -> StreamingTask<Vec<u8>, Completion>;

    /// Run with piped stdout/stderr; non-blank lines, killed through the handle.
    fn spawn_piped(&self, spec: &CommandSpec) -> (StreamingTask<String, Completion>, ProcessHandle);
}

// ── Network Probe Ports ───────────────────────────────────────────────────────

/// Reads the version a running workspace runtime reports about itself.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Fetch the self-reported version string.
    async fn fetch_version(&self) -> Result<String>;
}

/// Plain TCP reachability check.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Whether something accepts connections on `localhost:<port>`.
    async fn is_reachable(&self, port: u16) -> bool;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts engine configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when absent.
    fn load(&self) -> Result<EngineConfig>;
    /// Persist the configuration.
    fn save(&self, config: &EngineConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
