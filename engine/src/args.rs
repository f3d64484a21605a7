//! Command-line arguments for embedding programs.
//!
//! [`LifecycleArgs`] is a `clap` argument group; flatten it into a command
//! and call [`LifecycleArgs::into_request`] to get a [`LifecycleRequest`].

use std::path::Path;

use clap::Args;

use crate::domain::config::EngineConfig;
use crate::domain::request::{
    DEFAULT_PORT, DEV_IMAGE, DEV_SUFFIX, IMAGE_REPOSITORY, LifecycleRequest, ResourceLimits,
    default_image, published_port,
};

/// Host port of the in-container SSH server.
pub const SSH_PORT: u16 = 2222;

/// Options that shape one initialization attempt.
#[derive(Args, Debug, Clone, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)] // independent CLI switches
pub struct LifecycleArgs {
    /// Container image to run
    #[arg(short, long)]
    pub image: Option<String>,

    /// Container name (derived from the project directory if omitted)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Run the locally built development image
    #[arg(long)]
    pub dev: bool,

    /// Pull (or rebuild) the image even if it exists
    #[arg(long)]
    pub refresh: bool,

    /// Port mappings, host:container
    #[arg(short, long = "port", value_name = "MAPPING")]
    pub ports: Vec<String>,

    /// Environment variables: FOO=bar, or FOO to forward the host value
    #[arg(short, long = "env", value_name = "VAR")]
    pub env: Vec<String>,

    /// CPUs to allocate
    #[arg(long)]
    pub cpus: Option<f64>,

    /// Memory to allocate, in GB
    #[arg(long, value_name = "GB")]
    pub memory: Option<f64>,

    /// Remove an existing stopped container before starting
    #[arg(long)]
    pub rm: bool,

    /// Disable the SSH server
    #[arg(long)]
    pub no_ssh: bool,

    /// Mount the Docker socket into the container
    #[arg(long)]
    pub dind: bool,
}

impl LifecycleArgs {
    /// Build the request, forwarding bare `-e NAME` values from this process.
    #[must_use]
    pub fn into_request(
        self,
        version: &str,
        source_root: &Path,
        config: &EngineConfig,
    ) -> LifecycleRequest {
        self.into_request_with_env(version, source_root, config, |key| {
            std::env::var(key).ok()
        })
    }

    /// Like [`into_request`](Self::into_request) with an explicit host
    /// environment.
    #[must_use]
    pub fn into_request_with_env(
        self,
        version: &str,
        source_root: &Path,
        config: &EngineConfig,
        host_env: impl Fn(&str) -> Option<String>,
    ) -> LifecycleRequest {
        let image = if self.dev {
            DEV_IMAGE.to_string()
        } else {
            self.image.unwrap_or_else(|| default_image(version))
        };
        let container_name = self
            .name
            .unwrap_or_else(|| derived_name(source_root, self.dev));

        let ssh_enabled = !self.no_ssh;
        let mut ports = self.ports;
        if ports.is_empty() {
            ports.push(format!("{DEFAULT_PORT}:{DEFAULT_PORT}"));
        }
        if ssh_enabled && !maps_port(&ports, SSH_PORT) {
            ports.push(format!("{SSH_PORT}:{SSH_PORT}"));
        }
        let health_port = published_port(&ports, DEFAULT_PORT).unwrap_or(DEFAULT_PORT);

        let defaults = ResourceLimits::from(config.limits);
        LifecycleRequest {
            image,
            container_name,
            source_root: source_root.to_path_buf(),
            dev_mode: self.dev,
            force_refresh: self.refresh,
            ssh_enabled,
            limits: ResourceLimits {
                cpus: self.cpus.unwrap_or(defaults.cpus),
                memory_gb: self.memory.unwrap_or(defaults.memory_gb),
            },
            env_vars: resolve_env(&self.env, host_env),
            remove_existing: self.rm,
            version: version.to_string(),
            ports,
            dind: self.dind,
            health_port,
        }
    }
}

/// `catnip-<dir>`, or plain `catnip` for the tool's own checkout.
fn derived_name(source_root: &Path, dev: bool) -> String {
    let base = source_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = if base == IMAGE_REPOSITORY || base.is_empty() {
        IMAGE_REPOSITORY.to_string()
    } else {
        format!("{IMAGE_REPOSITORY}-{base}")
    };
    if dev {
        name.push_str(DEV_SUFFIX);
    }
    name
}

fn maps_port(ports: &[String], port: u16) -> bool {
    let host = format!("{port}:");
    let container = format!(":{port}");
    ports
        .iter()
        .any(|p| p.starts_with(&host) || p.ends_with(&container))
}

/// `DEBUG` is always forwarded; bare names take the host value or are skipped.
fn resolve_env(entries: &[String], host_env: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut resolved = Vec::with_capacity(entries.len() + 1);
    resolved.push(format!("DEBUG={}", host_env("DEBUG").unwrap_or_default()));
    for entry in entries {
        if entry.contains('=') {
            resolved.push(entry.clone());
        } else if let Some(value) = host_env(entry) {
            resolved.push(format!("{entry}={value}"));
        }
    }
    resolved
}
