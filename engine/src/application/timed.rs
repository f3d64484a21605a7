//! Bounded status queries.
//!
//! [`TimedDriver`] wraps any [`RuntimeDriver`] so that status queries give up
//! after a fixed limit. A timed-out boolean query reads as `false`, a
//! timed-out lookup as an error. Mutating calls are passed through untouched.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::warn;

use crate::application::ports::{CommandSpec, RunSpec, RunningContainer, RuntimeDriver};
use crate::domain::error::RunContainerError;
use crate::domain::runtime::ContainerRuntime;

pub struct TimedDriver {
    inner: Arc<dyn RuntimeDriver>,
    limit: Duration,
}

impl TimedDriver {
    #[must_use]
    pub fn new(inner: Arc<dyn RuntimeDriver>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        query: &'static str,
        fut: impl Future<Output = T> + Send,
        fallback: impl FnOnce() -> T + Send,
    ) -> T {
        if let Ok(value) = tokio::time::timeout(self.limit, fut).await {
            value
        } else {
            warn!(query, limit = ?self.limit, "runtime query timed out");
            fallback()
        }
    }
}

#[async_trait]
impl RuntimeDriver for TimedDriver {
    fn runtime(&self) -> ContainerRuntime {
        self.inner.runtime()
    }

    async fn image_exists(&self, image: &str) -> bool {
        self.bounded("image_exists", self.inner.image_exists(image), || false)
            .await
    }

    async fn pull_image(&self, image: &str) -> Result<CommandSpec> {
        self.bounded("pull_image", self.inner.pull_image(image), || {
            Err(anyhow!("timed out preparing pull of {image}"))
        })
        .await
    }

    async fn build_dev_image(&self, source_root: &Path) -> Result<CommandSpec> {
        self.bounded("build_dev_image", self.inner.build_dev_image(source_root), || {
            Err(anyhow!("timed out preparing build in {}", source_root.display()))
        })
        .await
    }

    async fn run_container(&self, spec: &RunSpec<'_>) -> Result<Vec<String>, RunContainerError> {
        self.inner.run_container(spec).await
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.inner.start_container(name).await
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.inner.stop_container(name).await
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.inner.remove_container(name).await
    }

    async fn is_container_running(&self, name: &str) -> bool {
        self.bounded("is_container_running", self.inner.is_container_running(name), || false)
            .await
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.bounded("container_exists", self.inner.container_exists(name), || false)
            .await
    }

    async fn container_image(&self, name: &str) -> Result<String> {
        self.bounded("container_image", self.inner.container_image(name), || {
            Err(anyhow!("timed out reading image of {name}"))
        })
        .await
    }

    async fn container_logs(&self, name: &str, follow: bool) -> Result<CommandSpec> {
        self.bounded("container_logs", self.inner.container_logs(name, follow), || {
            Err(anyhow!("timed out preparing logs of {name}"))
        })
        .await
    }

    async fn find_running_catnip_container(&self) -> Option<RunningContainer> {
        self.bounded(
            "find_running_catnip_container",
            self.inner.find_running_catnip_container(),
            || None,
        )
        .await
    }
}
