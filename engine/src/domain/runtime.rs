//! Identity of the container runtime behind the driver.

use std::fmt;

/// Container runtime family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    /// Docker (or a Docker-compatible CLI).
    Docker,
    /// Apple's `container` runtime.
    Apple,
}

impl ContainerRuntime {
    /// Executable name used on the command line.
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Apple => "container",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}
