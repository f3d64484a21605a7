//! Lifecycle phases, the events that move between them, and the pure
//! transition function.
//!
//! The engine owns exactly one [`LifecyclePhase`] and feeds every background
//! result through [`transition`] as a [`LifecycleEvent`].

use std::fmt;
use std::path::PathBuf;

use crate::domain::health::HealthOutcome;

// ── Decision types ────────────────────────────────────────────────────────────

/// Next step chosen by the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do; initialization was cancelled.
    None,
    /// Pull the given image.
    Pull(String),
    /// Build the development image from the given source root.
    Build(PathBuf),
    /// Image present; start the container.
    StartContainer,
    /// Container already running; reconnect to it.
    SkipToReady,
}

/// Result of one decision pass: user-facing status plus the next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Headline, e.g. `"Pulling container image..."`.
    pub status: String,
    /// Detail line, e.g. `"Pulling wandb/catnip:1.2.3"`.
    pub current_action: String,
    /// What happens next.
    pub action: Action,
}

/// How a streamed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure,
}

// ── Phases ────────────────────────────────────────────────────────────────────

/// Exactly one phase is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    CheckingRunning,
    Deciding,
    Pulling,
    Building,
    StartingContainer,
    MonitoringHealth,
    Healthy,
    Failed,
}

impl LifecyclePhase {
    /// `Healthy` and `Failed` absorb every event.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Healthy | Self::Failed)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckingRunning => "checking-running",
            Self::Deciding => "deciding",
            Self::Pulling => "pulling",
            Self::Building => "building",
            Self::StartingContainer => "starting-container",
            Self::MonitoringHealth => "monitoring-health",
            Self::Healthy => "healthy",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Results arriving from background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The initial running check finished.
    RunningChecked { running: bool },
    /// The decision engine chose the next action.
    Decided(Decision),
    /// A pull or build stream ended.
    StreamFinished(Completion),
    /// The container is up (possibly a reused sibling).
    ContainerStarted { name: String },
    /// Starting the container failed; `message` is already classified.
    StartFailed { message: String },
    /// The health monitor settled.
    HealthResolved(HealthOutcome),
    /// Anything else that ends the attempt: cancellation, missing commands.
    Aborted { reason: String },
}

/// Compute the phase that follows `event`.
///
/// Events that make no sense for the current phase leave it unchanged.
#[must_use]
pub fn transition(phase: LifecyclePhase, event: &LifecycleEvent) -> LifecyclePhase {
    use LifecycleEvent as E;
    use LifecyclePhase as P;

    if phase.is_terminal() {
        return phase;
    }

    match (phase, event) {
        (_, E::Aborted { .. }) => P::Failed,
        (P::CheckingRunning, E::RunningChecked { running: true }) => P::Healthy,
        (P::CheckingRunning, E::RunningChecked { running: false }) => P::Deciding,
        (P::CheckingRunning | P::Deciding, E::Decided(decision)) => match decision.action {
            Action::None => P::Failed,
            Action::Pull(_) => P::Pulling,
            Action::Build(_) => P::Building,
            Action::StartContainer => P::StartingContainer,
            Action::SkipToReady => P::Healthy,
        },
        (P::Pulling | P::Building, E::StreamFinished(Completion::Success)) => P::Deciding,
        (P::Pulling | P::Building, E::StreamFinished(Completion::Failure)) => P::Failed,
        (P::StartingContainer, E::ContainerStarted { .. }) => P::MonitoringHealth,
        (P::StartingContainer, E::StartFailed { .. }) => P::Failed,
        (P::MonitoringHealth, E::HealthResolved(outcome)) => {
            if outcome.is_healthy() {
                P::Healthy
            } else {
                P::Failed
            }
        }
        _ => phase,
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
