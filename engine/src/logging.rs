//! Diagnostic logging to a file.
//!
//! The embedding UI owns the terminal, so nothing is written to stdout or
//! stderr. Filter directives come from `CATNIP_LOG`, falling back to
//! [`LogConfig::filter`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::config::LogConfig;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "CATNIP_LOG";

/// Directory the log file is written to.
///
/// # Errors
///
/// Returns an error if no directory is configured and the home directory
/// cannot be determined.
pub fn log_directory(config: &LogConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.directory {
        return Ok(dir.clone());
    }
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".catnip").join("logs"))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for as long as logs should be flushed.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the filter is
/// malformed, or a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    let dir = log_directory(config)?;
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let (writer, guard) = non_blocking(rolling::never(&dir, &config.file_name));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {LOG_ENV} value: {directives}"))?,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter: {}", config.filter))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("cannot install log subscriber")?;

    info!(
        "logging to {}",
        dir.join(&config.file_name).display()
    );
    Ok(guard)
}
