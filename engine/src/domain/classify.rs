//! Turns raw runtime failures into actionable guidance.
//!
//! Pure functions only: the raw error text, the failing command and the image
//! go in, a [`ClassifiedError`] (or the generic format) comes out.

use std::fmt;

use crate::domain::request::DEFAULT_PORT;
use crate::domain::runtime::ContainerRuntime;

/// Marker the runtime driver puts in front of captured process output.
pub const OUTPUT_MARKER: &str = "\nOutput:";

/// Known infrastructure failure families, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The runtime daemon is not running or not reachable.
    DaemonUnreachable,
    /// The image is missing locally and could not be pulled.
    ImageUnavailable,
    /// A required host port is already bound.
    PortConflict,
    /// Disk or memory exhausted.
    ResourceExhausted,
}

/// A runtime failure with remediation text attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    /// Which failure family matched.
    pub category: ErrorCategory,
    /// Headline and fix-it steps.
    pub remediation: String,
    /// The command that failed, as shown to the user.
    pub original_command: String,
    /// Captured process output extracted from the raw error.
    pub captured_output: String,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\nCommand: {}\nOutput: {}",
            self.remediation, self.original_command, self.captured_output
        )
    }
}

const DAEMON_SIGNATURES: &[&str] = &[
    "cannot connect to the docker daemon",
    "docker daemon is not running",
    "connection refused",
];

/// Only meaningful for Docker: the CLI or its socket is missing entirely.
const DOCKER_MISSING_SIGNATURES: &[&str] = &["no such file or directory", "command not found"];

const IMAGE_SIGNATURES: &[&str] = &[
    "unable to find image",
    "pull access denied",
    "repository does not exist",
    "no such image",
    "manifest unknown",
    "401 unauthorized",
];

const PORT_SIGNATURES: &[&str] = &["port is already allocated", "bind: address already in use"];

const RESOURCE_SIGNATURES: &[&str] = &[
    "insufficient memory",
    "not enough memory",
    "no space left on device",
];

fn matches_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Detect a known failure signature in `raw_error`.
///
/// Matching is case-insensitive and follows [`ErrorCategory`] order. Returns
/// `None` when nothing matched; callers then use [`format_generic`].
#[must_use]
pub fn classify(
    raw_error: &str,
    command: &str,
    image: &str,
    runtime: ContainerRuntime,
) -> Option<ClassifiedError> {
    let lower = raw_error.to_lowercase();

    let (category, remediation) = if matches_any(&lower, DAEMON_SIGNATURES)
        || (runtime == ContainerRuntime::Docker && matches_any(&lower, DOCKER_MISSING_SIGNATURES))
    {
        (
            ErrorCategory::DaemonUnreachable,
            "Docker is not running or not accessible.\n\n\
             🔧 To fix this:\n\
             • Start Docker Desktop (macOS/Windows)\n\
             • Or start the Docker daemon (Linux): sudo systemctl start docker\n\
             • Make sure your user is in the docker group (Linux): sudo usermod -aG docker $USER"
                .to_string(),
        )
    } else if matches_any(&lower, IMAGE_SIGNATURES) {
        (
            ErrorCategory::ImageUnavailable,
            format!(
                "Container image '{image}' is not available locally and could not be pulled.\n\n\
                 🔧 To fix this:\n\
                 • Try manually pulling the image: {runtime} pull {image}\n\
                 • Check if the image name and tag are correct\n\
                 • If it's a private image, make sure you're authenticated"
            ),
        )
    } else if matches_any(&lower, PORT_SIGNATURES) {
        (
            ErrorCategory::PortConflict,
            format!(
                "Port conflict - another service is using the required ports.\n\n\
                 🔧 To fix this:\n\
                 • Stop other containers using the same ports\n\
                 • Use different ports with the --port flag\n\
                 • Check what's using the ports: lsof -i :{DEFAULT_PORT}"
            ),
        )
    } else if matches_any(&lower, RESOURCE_SIGNATURES) {
        (
            ErrorCategory::ResourceExhausted,
            format!(
                "Insufficient system resources to start the container.\n\n\
                 🔧 To fix this:\n\
                 • Free up disk space or memory\n\
                 • Reduce resource limits with --cpus and --memory flags\n\
                 • Clean up unused images: {runtime} system prune"
            ),
        )
    } else {
        return None;
    };

    Some(ClassifiedError {
        category,
        remediation,
        original_command: command.to_string(),
        captured_output: extract_output(raw_error),
    })
}

/// Extract the captured output section of a raw runtime error.
///
/// Everything after [`OUTPUT_MARKER`] is returned with a single leading
/// space removed; inner newlines are kept. Without a marker the trimmed
/// error itself is the output.
#[must_use]
pub fn extract_output(raw_error: &str) -> String {
    match raw_error.split_once(OUTPUT_MARKER) {
        Some((_, output)) => output.strip_prefix(' ').unwrap_or(output).to_string(),
        None => raw_error.trim().to_string(),
    }
}

/// Generic failure format: base message, then command, then output if any.
#[must_use]
pub fn format_generic(raw_error: &str, command: &str) -> String {
    match raw_error.split_once(OUTPUT_MARKER) {
        Some((base, output)) => {
            let output = output.strip_prefix(' ').unwrap_or(output);
            format!("{base}\nCommand: {command}\nOutput: {output}")
        }
        None => format!("{raw_error}\nCommand: {command}"),
    }
}

/// Classified message when a signature matches, generic format otherwise.
#[must_use]
pub fn describe_failure(
    raw_error: &str,
    command: &str,
    image: &str,
    runtime: ContainerRuntime,
) -> String {
    classify(raw_error, command, image, runtime)
        .map_or_else(|| format_generic(raw_error, command), |c| c.to_string())
}

// ── Unit tests ────────────────────────────────────────────────────────────────
