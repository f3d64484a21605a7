//! Health check domain types and the pure per-tick decision.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Timing knobs of the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    /// Delay between two polls, in milliseconds.
    pub interval_ms: u64,
    /// Time the container gets to bind its port before probing, in milliseconds.
    pub grace_ms: u64,
    /// Poll loop gives up after this long, in milliseconds.
    pub poll_ceiling_ms: u64,
    /// Whole monitor gives up after this long, in milliseconds.
    pub overall_ceiling_ms: u64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            grace_ms: 2_000,
            poll_ceiling_ms: 30_000,
            overall_ceiling_ms: 60_000,
        }
    }
}

impl HealthPolicy {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    #[must_use]
    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_millis(self.poll_ceiling_ms)
    }

    #[must_use]
    pub fn overall_ceiling(&self) -> Duration {
        Duration::from_millis(self.overall_ceiling_ms)
    }
}

/// What one poll tick observed. Recomputed every tick, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    /// Whether the runtime still reports the container as running.
    pub container_running: bool,
    /// Whether the TCP probe succeeded (always `false` during the grace period).
    pub port_reachable: bool,
    /// Time since monitoring started.
    pub elapsed: Duration,
}

/// Why a container was declared unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhealthyReason {
    /// The container exited while we were waiting for it.
    StoppedUnexpectedly,
    /// Neither outcome happened before a ceiling.
    TimedOut,
}

impl fmt::Display for UnhealthyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoppedUnexpectedly => f.write_str("stopped unexpectedly"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Terminal verdict of the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    Unhealthy(UnhealthyReason),
}

impl HealthOutcome {
    #[must_use]
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

// ── Pure functions ────────────────────────────────────────────────────────────

/// Decide whether a tick settles the outcome.
///
/// A stopped container wins over everything, then a reachable port, then the
/// poll ceiling. `None` means keep polling.
#[must_use]
pub fn evaluate(state: &HealthState, policy: &HealthPolicy) -> Option<HealthOutcome> {
    if !state.container_running {
        return Some(HealthOutcome::Unhealthy(
            UnhealthyReason::StoppedUnexpectedly,
        ));
    }
    if state.port_reachable {
        return Some(HealthOutcome::Healthy);
    }
    if state.elapsed > policy.poll_ceiling() {
        return Some(HealthOutcome::Unhealthy(UnhealthyReason::TimedOut));
    }
    None
}

/// Whether the port should be probed at this point of the run.
#[must_use]
pub fn past_grace(elapsed: Duration, policy: &HealthPolicy) -> bool {
    elapsed > policy.grace()
}

// ── Unit tests ────────────────────────────────────────────────────────────────
