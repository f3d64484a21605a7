//! Network probes: TCP reachability and the runtime's version endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpStream;
use tracing::debug;

use crate::application::ports::{PortProbe, VersionProbe};
use crate::domain::config::EngineConfig;
use crate::domain::request::LifecycleRequest;

/// Connect attempts give up after this long.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Checks `localhost:<port>` with a plain TCP connect.
#[derive(Debug, Clone)]
pub struct TcpPortProbe {
    connect_timeout: Duration,
}

impl Default for TcpPortProbe {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn is_reachable(&self, port: u16) -> bool {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(("localhost", port)))
            .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!(port, error = %err, "port not reachable");
                false
            }
            Err(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    version: String,
}

/// Reads `{"version": ...}` from the runtime's info endpoint.
#[derive(Debug, Clone)]
pub struct HttpVersionProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpVersionProbe {
    /// Probe `GET <base_url><path>` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}{path}", base_url.trim_end_matches('/')),
        })
    }

    /// Probe for a runtime published on `port`, as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &EngineConfig, port: u16) -> Result<Self> {
        Self::new(
            &config.version_endpoint.base_url(port),
            &config.version_endpoint.path,
            config.timeouts.http_client(),
        )
    }

    /// Probe for the workspace `request` publishes, on its health port.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn for_request(config: &EngineConfig, request: &LifecycleRequest) -> Result<Self> {
        Self::from_config(config, request.health_port)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VersionProbe for HttpVersionProbe {
    async fn fetch_version(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("cannot reach container API at {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("container API returned status {}", status.as_u16());
        }
        let info: InfoResponse = resp
            .json()
            .await
            .context("failed to decode version response")?;
        Ok(info.version)
    }
}
