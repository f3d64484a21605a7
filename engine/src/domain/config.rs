//! Engine configuration schema and validation.
//!
//! Pure functions only: no I/O or async.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::health::HealthPolicy;
use crate::domain::request::ResourceLimits;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.catnip/engine.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Default container resource limits.
    pub limits: LimitsConfig,
    /// Per-operation timeouts.
    pub timeouts: TimeoutConfig,
    /// Health monitor timings.
    pub health: HealthPolicy,
    /// Version endpoint of the workspace runtime.
    pub version_endpoint: VersionEndpointConfig,
    /// Diagnostic log settings.
    pub log: LogConfig,
}

/// Resource limits applied when the caller does not pass any.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub cpus: f64,
    pub memory_gb: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = ResourceLimits::default();
        Self {
            cpus: limits.cpus,
            memory_gb: limits.memory_gb,
        }
    }
}

impl From<LimitsConfig> for ResourceLimits {
    fn from(c: LimitsConfig) -> Self {
        Self {
            cpus: c.cpus,
            memory_gb: c.memory_gb,
        }
    }
}

/// Upper bounds for individual operations, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Runtime status queries (running/exists/image lookups).
    pub status_ms: u64,
    /// Whole version check including connection setup.
    pub version_check_ms: u64,
    /// HTTP client timeout of the version probe.
    pub http_client_ms: u64,
    /// Longest a single `next()` call may wait for background work.
    pub read_slice_ms: u64,
    /// Pause between removing a broken container and recreating it.
    pub recreate_pause_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            status_ms: 3_000,
            version_check_ms: 5_000,
            http_client_ms: 2_000,
            read_slice_ms: 100,
            recreate_pause_ms: 500,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn status(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    #[must_use]
    pub fn version_check(&self) -> Duration {
        Duration::from_millis(self.version_check_ms)
    }

    #[must_use]
    pub fn http_client(&self) -> Duration {
        Duration::from_millis(self.http_client_ms)
    }

    #[must_use]
    pub fn read_slice(&self) -> Duration {
        Duration::from_millis(self.read_slice_ms)
    }

    #[must_use]
    pub fn recreate_pause(&self) -> Duration {
        Duration::from_millis(self.recreate_pause_ms)
    }
}

/// Where the workspace runtime reports its version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionEndpointConfig {
    /// Host the runtime is published on.
    pub host: String,
    /// Path of the info endpoint.
    pub path: String,
}

impl Default for VersionEndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            path: "/v1/info".to_string(),
        }
    }
}

impl VersionEndpointConfig {
    /// Base URL for a runtime published on `port`.
    #[must_use]
    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{port}", self.host)
    }
}

/// Diagnostic log destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Directory of the log file. `None` uses `~/.catnip/logs`.
    pub directory: Option<PathBuf>,
    /// File name inside `directory`.
    pub file_name: String,
    /// Filter used when `CATNIP_LOG` is unset, e.g. `info` or `catnip_engine=debug`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: "engine.log".to_string(),
            filter: "info".to_string(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Reject settings that would make the engine block or spin.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String, valid: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            valid: valid.to_string(),
        };

        if self.timeouts.read_slice_ms == 0 || self.timeouts.read_slice_ms > 100 {
            return Err(invalid(
                "timeouts.read_slice_ms",
                self.timeouts.read_slice_ms.to_string(),
                "1..=100",
            ));
        }
        if self.health.interval_ms == 0 {
            return Err(invalid("health.interval_ms", "0".to_string(), "> 0"));
        }
        if self.health.overall_ceiling_ms < self.health.poll_ceiling_ms {
            return Err(invalid(
                "health.overall_ceiling_ms",
                self.health.overall_ceiling_ms.to_string(),
                ">= health.poll_ceiling_ms",
            ));
        }
        if self.limits.cpus <= 0.0 || self.limits.memory_gb <= 0.0 {
            return Err(invalid(
                "limits",
                format!("cpus={} memory_gb={}", self.limits.cpus, self.limits.memory_gb),
                "positive numbers",
            ));
        }
        Ok(())
    }
}
