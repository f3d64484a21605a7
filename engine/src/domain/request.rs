//! Lifecycle request and image naming rules.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::path::PathBuf;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Registry namespace of the published workspace image.
pub const IMAGE_NAMESPACE: &str = "wandb";

/// Repository name of the published workspace image.
pub const IMAGE_REPOSITORY: &str = "catnip";

/// Fixed tag of the locally built development image.
pub const DEV_IMAGE: &str = "catnip-dev:dev";

/// Tag carried by development images.
pub const DEV_TAG: &str = "dev";

/// Suffix appended to container names and versions in development mode.
pub const DEV_SUFFIX: &str = "-dev";

/// Port the workspace runtime listens on inside and outside the container.
pub const DEFAULT_PORT: u16 = 6369;

// ── Value Types ───────────────────────────────────────────────────────────────

/// CPU and memory limits handed to the runtime driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimits {
    /// Number of CPUs, e.g. `4.0`.
    pub cpus: f64,
    /// Memory in gigabytes, e.g. `4.0`.
    pub memory_gb: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpus: 4.0,
            memory_gb: 4.0,
        }
    }
}

/// Everything one initialization attempt needs to know.
///
/// Built once and never mutated; retrying means building a new request.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)] // independent CLI switches, not a state machine
pub struct LifecycleRequest {
    /// Desired image reference, e.g. `wandb/catnip:1.2.3`.
    pub image: String,
    /// Desired container name.
    pub container_name: String,
    /// Root of the source checkout mounted into the container.
    pub source_root: PathBuf,
    /// Build and run the development image instead of pulling.
    pub dev_mode: bool,
    /// Pull or rebuild even when the image is present.
    pub force_refresh: bool,
    /// Start the container with SSH enabled.
    pub ssh_enabled: bool,
    /// CPU and memory limits.
    pub limits: ResourceLimits,
    /// `KEY=VALUE` environment entries passed to the container.
    pub env_vars: Vec<String>,
    /// Remove an existing stopped container before starting.
    pub remove_existing: bool,
    /// Version of the calling CLI, e.g. `v1.2.3-dev`.
    pub version: String,
    /// Port mappings, `host:container`. Empty means [`DEFAULT_PORT`] on both sides.
    pub ports: Vec<String>,
    /// Enable docker-in-docker inside the workspace.
    pub dind: bool,
    /// Host port probed by the health monitor.
    pub health_port: u16,
}

impl LifecycleRequest {
    /// Port mappings to pass to the driver, falling back to the default mapping.
    #[must_use]
    pub fn effective_ports(&self) -> Vec<String> {
        if self.ports.is_empty() {
            vec![format!("{DEFAULT_PORT}:{DEFAULT_PORT}")]
        } else {
            self.ports.clone()
        }
    }

    /// Whether the requested image differs from the one derived from the CLI version.
    #[must_use]
    pub fn is_custom_image(&self) -> bool {
        is_custom_image(&self.image, self.dev_mode, &self.version)
    }
}

// ── Pure functions ────────────────────────────────────────────────────────────

/// Strip a leading `v` and a trailing `-dev` from a version string.
///
/// `v1.2.3-dev` → `1.2.3`.
#[must_use]
pub fn clean_version(version: &str) -> &str {
    let version = version.strip_prefix('v').unwrap_or(version);
    version.strip_suffix(DEV_SUFFIX).unwrap_or(version)
}

/// Image reference published for a given CLI version.
#[must_use]
pub fn default_image(cli_version: &str) -> String {
    format!(
        "{IMAGE_NAMESPACE}/{IMAGE_REPOSITORY}:{}",
        clean_version(cli_version)
    )
}

/// Whether `image` was chosen by the user rather than derived from the CLI version.
///
/// Development mode always counts as custom: the dev image is a local build.
#[must_use]
pub fn is_custom_image(image: &str, dev_mode: bool, cli_version: &str) -> bool {
    dev_mode || image != default_image(cli_version)
}

/// Split an image reference into repository and tag.
///
/// A colon only separates the tag when it comes after the last `/`, so
/// registry ports are left alone. Missing tags default to `latest`.
#[must_use]
pub fn parse_image_and_tag(image: &str) -> (&str, &str) {
    let slash = image.rfind('/');
    match image.rfind(':') {
        Some(colon) if slash.is_none_or(|s| colon > s) => (&image[..colon], &image[colon + 1..]),
        _ => (image, "latest"),
    }
}

/// Container name with any development suffix removed.
#[must_use]
pub fn base_container_name(name: &str) -> &str {
    name.strip_suffix(DEV_SUFFIX).unwrap_or(name)
}

/// Host port that a mapping publishes `container_port` on.
///
/// Accepts `host:container` and `ip:host:container`, with an optional
/// `/tcp` or `/udp` suffix. The first matching mapping wins.
#[must_use]
pub fn published_port(ports: &[String], container_port: u16) -> Option<u16> {
    ports.iter().find_map(|mapping| {
        let mapping = mapping.split_once('/').map_or(mapping.as_str(), |(m, _)| m);
        let mut parts = mapping.rsplit(':');
        let container = parts.next()?.parse::<u16>().ok()?;
        let host = parts.next()?.parse::<u16>().ok()?;
        (container == container_port).then_some(host)
    })
}

// ── Unit tests ────────────────────────────────────────────────────────────────
