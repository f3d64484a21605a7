//! Application service: container start use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use tracing::{debug, info, warn};

use crate::application::ports::{RunSpec, RuntimeDriver, VersionProbe};
use crate::application::services::compatibility::resolve;
use crate::domain::classify::{classify, describe_failure, format_generic};
use crate::domain::config::TimeoutConfig;
use crate::domain::error::RunContainerError;
use crate::domain::phase::LifecycleEvent;
use crate::domain::request::LifecycleRequest;

/// Outcome of the `start_container` use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The desired container is up.
    Started { container: String },
    /// A compatible sibling was already running and is used instead.
    Reused { container: String },
    /// Nothing is running; `message` names the command and its output.
    Failed { message: String },
}

impl From<StartOutcome> for LifecycleEvent {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started { container } | StartOutcome::Reused { container } => {
                Self::ContainerStarted { name: container }
            }
            StartOutcome::Failed { message } => Self::StartFailed { message },
        }
    }
}

fn run_spec<'a>(
    request: &'a LifecycleRequest,
    ports: &'a [String],
    force_remove: bool,
) -> RunSpec<'a> {
    RunSpec {
        image: &request.image,
        name: &request.container_name,
        source_root: &request.source_root,
        ports,
        dev_mode: request.dev_mode,
        ssh_enabled: request.ssh_enabled,
        force_remove,
        limits: request.limits,
        env_vars: &request.env_vars,
        dind: request.dind,
    }
}

/// Get the requested container running.
///
/// Reuses or replaces running siblings as the compatibility rules say, then
/// runs the container. A name conflict is recovered by starting the existing
/// container, or by removing and recreating it after a short pause.
pub async fn start_container(
    driver: &dyn RuntimeDriver,
    versions: &dyn VersionProbe,
    request: &LifecycleRequest,
    timeouts: &TimeoutConfig,
) -> StartOutcome {
    let resolution = resolve(driver, versions, request, timeouts.version_check()).await;

    if let Some(sibling) = resolution.reuse {
        return StartOutcome::Reused {
            container: sibling.name,
        };
    }
    if let Some(sibling) = &resolution.replace {
        if let Err(err) = driver.stop_container(&sibling.name).await {
            warn!(container = %sibling.name, error = %format!("{err:#}"), "failed to stop container");
        }
        if let Err(err) = driver.remove_container(&sibling.name).await {
            warn!(container = %sibling.name, error = %format!("{err:#}"), "failed to remove container");
        }
    }

    let ports = request.effective_ports();
    let spec = run_spec(request, &ports, resolution.force_remove_existing);
    match driver.run_container(&spec).await {
        Ok(command) => {
            info!(command = %command.join(" "), "container started");
            StartOutcome::Started {
                container: request.container_name.clone(),
            }
        }
        Err(err) => recover(driver, request, &ports, &err, timeouts).await,
    }
}

async fn recover(
    driver: &dyn RuntimeDriver,
    request: &LifecycleRequest,
    ports: &[String],
    err: &RunContainerError,
    timeouts: &TimeoutConfig,
) -> StartOutcome {
    let name = request.container_name.as_str();
    let command = err.command_line();
    warn!(%command, error = %err, "run failed");

    if let Some(classified) = classify(&err.message, &command, &request.image, driver.runtime()) {
        return StartOutcome::Failed {
            message: classified.to_string(),
        };
    }
    if !err.is_already_exists() {
        return StartOutcome::Failed {
            message: format_generic(&err.message, &command),
        };
    }

    let started = StartOutcome::Started {
        container: name.to_string(),
    };
    if driver.is_container_running(name).await {
        debug!(container = name, "existing container already running");
        return started;
    }
    match driver.start_container(name).await {
        Ok(()) => {
            info!(container = name, "started existing container");
            return started;
        }
        Err(err) => {
            warn!(container = name, error = %format!("{err:#}"), "existing container would not start, recreating");
        }
    }

    // Partially started containers must be stopped before removal.
    let _ = driver.stop_container(name).await;
    let _ = driver.remove_container(name).await;
    tokio::time::sleep(timeouts.recreate_pause()).await;

    let spec = run_spec(request, ports, request.remove_existing);
    match driver.run_container(&spec).await {
        Ok(_) => started,
        Err(err) => {
            warn!(error = %err, "recreate failed");
            StartOutcome::Failed {
                message: describe_failure(
                    &err.message,
                    &err.command_line(),
                    &request.image,
                    driver.runtime(),
                ),
            }
        }
    }
}
