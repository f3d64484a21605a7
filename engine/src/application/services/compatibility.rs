//! Application service: reconcile the request with containers that already
//! exist.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::cmp::Ordering;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::application::ports::{RunningContainer, RuntimeDriver, VersionProbe};
use crate::domain::compat::{must_recreate, verdict};
use crate::domain::request::{DEV_TAG, LifecycleRequest, base_container_name, parse_image_and_tag};
use crate::domain::version::{compare_versions, parse_strict};

/// What to do with existing containers before starting the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// A compatible sibling to use instead of starting anything.
    pub reuse: Option<RunningContainer>,
    /// An incompatible sibling the caller must stop and remove.
    pub replace: Option<RunningContainer>,
    /// Remove a stopped container with the desired name before running.
    pub force_remove_existing: bool,
}

/// Result of comparing the CLI version with a running container's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    /// The CLI is newer than the container.
    pub upgrade_available: bool,
    /// Version the container reported, or `"unknown"`.
    pub container_version: String,
    pub cli_version: String,
}

/// Fetch the runtime's version, giving up after `limit`.
async fn fetch_version(versions: &dyn VersionProbe, limit: Duration) -> Option<String> {
    match tokio::time::timeout(limit, versions.fetch_version()).await {
        Ok(Ok(version)) => Some(version),
        Ok(Err(err)) => {
            debug!(error = %format!("{err:#}"), "version endpoint unavailable");
            None
        }
        Err(_) => {
            debug!(?limit, "version check timed out");
            None
        }
    }
}

/// Decide between reuse, replace, and (forced) recreate.
///
/// `version_limit` bounds the sibling version check, which only happens when
/// the sibling's base name matches.
pub async fn resolve(
    driver: &dyn RuntimeDriver,
    versions: &dyn VersionProbe,
    request: &LifecycleRequest,
    version_limit: Duration,
) -> Resolution {
    let name = request.container_name.as_str();
    let mut resolution = Resolution {
        force_remove_existing: request.remove_existing,
        ..Resolution::default()
    };

    if driver.is_container_running(name).await {
        return resolution;
    }

    if let Some(sibling) = driver.find_running_catnip_container().await {
        let reported = if base_container_name(&sibling.name) == base_container_name(name) {
            fetch_version(versions, version_limit).await
        } else {
            None
        };
        let v = verdict(&sibling.name, name, reported.as_deref(), &request.version);
        if v.compatible {
            info!(container = %sibling.name, "reusing compatible running container");
            resolution.reuse = Some(sibling);
            return resolution;
        }
        info!(
            container = %sibling.name,
            names_match = v.names_match,
            version_matches = v.version_matches,
            "replacing incompatible running container"
        );
        resolution.replace = Some(sibling);
    }

    if driver.container_exists(name).await {
        if request.is_custom_image() {
            debug!(image = %request.image, "custom image requested, recreating container");
            resolution.force_remove_existing = true;
        } else if let Ok(existing) = driver.container_image(name).await {
            warn_if_coerced(&request.image, &existing);
            if must_recreate(&request.image, &existing, request.dev_mode) {
                info!(desired = %request.image, existing = %existing, "recreating stopped container");
                resolution.force_remove_existing = true;
            }
        }
    }

    resolution
}

/// Tag comparison is permissive; say so when a tag is not strictly valid.
fn warn_if_coerced(desired: &str, existing: &str) {
    let (_, desired_tag) = parse_image_and_tag(desired);
    let (_, existing_tag) = parse_image_and_tag(existing);
    if desired_tag == existing_tag {
        return;
    }
    for tag in [desired_tag, existing_tag] {
        if tag == DEV_TAG {
            continue;
        }
        if let Err(err) = parse_strict(tag) {
            warn!(%err, "comparing image tags permissively");
        }
    }
}

/// Compare the CLI version with what the running container reports.
///
/// An unreachable endpoint reports `"unknown"` and never offers an upgrade.
pub async fn check_upgrade(
    versions: &dyn VersionProbe,
    cli_version: &str,
    version_limit: Duration,
) -> VersionReport {
    match fetch_version(versions, version_limit).await {
        Some(container_version) => {
            let upgrade_available =
                compare_versions(cli_version, &container_version) == Ordering::Greater;
            debug!(cli_version, %container_version, upgrade_available, "version check");
            VersionReport {
                upgrade_available,
                container_version,
                cli_version: cli_version.to_string(),
            }
        }
        None => VersionReport {
            upgrade_available: false,
            container_version: "unknown".to_string(),
            cli_version: cli_version.to_string(),
        },
    }
}
