//! Application service: decide the next initialization step.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tracing::debug;

use crate::application::ports::RuntimeDriver;
use crate::domain::phase::{Action, Decision};
use crate::domain::request::{DEV_IMAGE, LifecycleRequest};

/// Inputs to [`decide`] that belong to the engine rather than the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecideContext {
    /// The user asked to quit; nothing new may start.
    pub quit_requested: bool,
    /// A pull or build already completed for this request, so a forced
    /// refresh has been satisfied.
    pub image_refreshed: bool,
}

fn decision(status: &str, current_action: impl Into<String>, action: Action) -> Decision {
    Decision {
        status: status.to_string(),
        current_action: current_action.into(),
        action,
    }
}

/// Choose what happens next for `request`.
///
/// Order: quit, already running, missing or stale image, start. For a fixed
/// runtime state the result is always the same.
pub async fn decide(
    driver: &dyn RuntimeDriver,
    request: &LifecycleRequest,
    ctx: &DecideContext,
) -> Decision {
    if ctx.quit_requested {
        return decision("Initialization cancelled", "", Action::None);
    }

    if driver.is_container_running(&request.container_name).await {
        debug!(container = %request.container_name, "container already running");
        return decision(
            "Container already running",
            "Connecting to existing instance",
            Action::SkipToReady,
        );
    }

    let refresh = request.force_refresh && !ctx.image_refreshed;
    if request.dev_mode {
        if refresh || !driver.image_exists(DEV_IMAGE).await {
            return decision(
                "Building development image...",
                "Running just build-dev",
                Action::Build(request.source_root.clone()),
            );
        }
    } else if refresh || !driver.image_exists(&request.image).await {
        return decision(
            "Pulling container image...",
            format!("Pulling {}", request.image),
            Action::Pull(request.image.clone()),
        );
    }

    decision(
        "Starting container...",
        "Starting container",
        Action::StartContainer,
    )
}
