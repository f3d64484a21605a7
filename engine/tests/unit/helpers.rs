//! Shared test helpers: an in-memory runtime driver, canned probes and
//! request constructors.

#![allow(dead_code, clippy::expect_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use catnip_engine::application::{
    CommandSpec, PortProbe, RunSpec, RunningContainer, RuntimeDriver, VersionProbe,
};
use catnip_engine::domain::request::DEV_IMAGE;
use catnip_engine::domain::{
    ContainerRuntime, LifecycleRequest, ResourceLimits, RunContainerError,
};

pub const CLI_VERSION: &str = "v1.2.0";
pub const IMAGE: &str = "wandb/catnip:1.2.0";
pub const NAME: &str = "catnip-project";

// ── Requests ─────────────────────────────────────────────────────────────────

pub fn request() -> LifecycleRequest {
    LifecycleRequest {
        image: IMAGE.to_string(),
        container_name: NAME.to_string(),
        source_root: PathBuf::from("/src/project"),
        dev_mode: false,
        force_refresh: false,
        ssh_enabled: true,
        limits: ResourceLimits::default(),
        env_vars: vec!["DEBUG=".to_string()],
        remove_existing: false,
        version: CLI_VERSION.to_string(),
        ports: vec!["6369:6369".to_string()],
        dind: false,
        health_port: 6369,
    }
}

pub fn dev_request() -> LifecycleRequest {
    LifecycleRequest {
        image: DEV_IMAGE.to_string(),
        container_name: format!("{NAME}-dev"),
        dev_mode: true,
        ..request()
    }
}

/// `sh -c <script>` as a command spec.
pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

// ── Fake runtime driver ──────────────────────────────────────────────────────

#[derive(Debug)]
struct DriverState {
    runtime: ContainerRuntime,
    images: HashSet<String>,
    running: HashSet<String>,
    /// Container name → image it was created from.
    existing: HashMap<String, String>,
    sibling: Option<RunningContainer>,
    run_errors: VecDeque<String>,
    start_fails: bool,
    stop_after_run: bool,
    pull_adds_image: bool,
    pull_command: CommandSpec,
    build_command: CommandSpec,
    logs_command: CommandSpec,
    calls: Vec<String>,
}

/// In-memory [`RuntimeDriver`] that records every mutating call.
#[derive(Debug)]
pub struct FakeDriver {
    state: Mutex<DriverState>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DriverState {
                runtime: ContainerRuntime::Docker,
                images: HashSet::new(),
                running: HashSet::new(),
                existing: HashMap::new(),
                sibling: None,
                run_errors: VecDeque::new(),
                start_fails: false,
                stop_after_run: false,
                pull_adds_image: true,
                pull_command: sh("echo pulled"),
                build_command: sh("echo built"),
                logs_command: sh("sleep 30"),
                calls: Vec::new(),
            }),
        }
    }

    fn with(self, f: impl FnOnce(&mut DriverState)) -> Self {
        {
            let mut state = self.state.lock().expect("lock");
            f(&mut *state);
        }
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.with(|s| {
            s.images.insert(image.to_string());
        })
    }

    pub fn with_running(self, name: &str) -> Self {
        self.with(|s| {
            s.running.insert(name.to_string());
            s.existing.insert(name.to_string(), IMAGE.to_string());
        })
    }

    pub fn with_existing(self, name: &str, image: &str) -> Self {
        self.with(|s| {
            s.existing.insert(name.to_string(), image.to_string());
        })
    }

    /// A running container of this tool under another name.
    pub fn with_sibling(self, name: &str, image: &str) -> Self {
        self.with(|s| {
            s.running.insert(name.to_string());
            s.existing.insert(name.to_string(), image.to_string());
            s.sibling = Some(RunningContainer {
                name: name.to_string(),
                image: image.to_string(),
            });
        })
    }

    /// Queue a `run_container` failure; queued failures are used in order.
    pub fn failing_run(self, message: &str) -> Self {
        self.with(|s| s.run_errors.push_back(message.to_string()))
    }

    pub fn failing_start(self) -> Self {
        self.with(|s| s.start_fails = true)
    }

    /// Containers exit right after `run_container` succeeds.
    pub fn stop_after_run(self) -> Self {
        self.with(|s| s.stop_after_run = true)
    }

    /// A finished pull leaves the image missing.
    pub fn pull_without_image(self) -> Self {
        self.with(|s| s.pull_adds_image = false)
    }

    pub fn with_runtime(self, runtime: ContainerRuntime) -> Self {
        self.with(|s| s.runtime = runtime)
    }

    pub fn with_pull_command(self, command: CommandSpec) -> Self {
        self.with(|s| s.pull_command = command)
    }

    pub fn with_build_command(self, command: CommandSpec) -> Self {
        self.with(|s| s.build_command = command)
    }

    pub fn with_logs_command(self, command: CommandSpec) -> Self {
        self.with(|s| s.logs_command = command)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("lock").calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn set_running(&self, name: &str, running: bool) {
        let mut s = self.state.lock().expect("lock");
        if running {
            s.running.insert(name.to_string());
        } else {
            s.running.remove(name);
        }
    }
}

#[async_trait]
impl RuntimeDriver for FakeDriver {
    fn runtime(&self) -> ContainerRuntime {
        self.state.lock().expect("lock").runtime
    }

    async fn image_exists(&self, image: &str) -> bool {
        self.state.lock().expect("lock").images.contains(image)
    }

    async fn pull_image(&self, image: &str) -> Result<CommandSpec> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("pull {image}"));
        if s.pull_adds_image {
            s.images.insert(image.to_string());
        }
        Ok(s.pull_command.clone())
    }

    async fn build_dev_image(&self, source_root: &Path) -> Result<CommandSpec> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("build {}", source_root.display()));
        if s.pull_adds_image {
            s.images.insert(DEV_IMAGE.to_string());
        }
        Ok(s.build_command.clone())
    }

    async fn run_container(&self, spec: &RunSpec<'_>) -> Result<Vec<String>, RunContainerError> {
        let command = vec![
            "docker".to_string(),
            "run".to_string(),
            "--name".to_string(),
            spec.name.to_string(),
            spec.image.to_string(),
        ];
        let mut s = self.state.lock().expect("lock");
        s.calls
            .push(format!("run {} force_remove={}", spec.name, spec.force_remove));
        if let Some(message) = s.run_errors.pop_front() {
            return Err(RunContainerError { command, message });
        }
        s.existing
            .insert(spec.name.to_string(), spec.image.to_string());
        if !s.stop_after_run {
            s.running.insert(spec.name.to_string());
        }
        Ok(command)
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("start {name}"));
        if s.start_fails {
            anyhow::bail!("container {name} failed to start");
        }
        s.running.insert(name.to_string());
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("stop {name}"));
        s.running.remove(name);
        if s.sibling.as_ref().is_some_and(|c| c.name == name) {
            s.sibling = None;
        }
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("remove {name}"));
        s.running.remove(name);
        s.existing.remove(name);
        Ok(())
    }

    async fn is_container_running(&self, name: &str) -> bool {
        self.state.lock().expect("lock").running.contains(name)
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.state.lock().expect("lock").existing.contains_key(name)
    }

    async fn container_image(&self, name: &str) -> Result<String> {
        self.state
            .lock()
            .expect("lock")
            .existing
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such container: {name}"))
    }

    async fn container_logs(&self, name: &str, follow: bool) -> Result<CommandSpec> {
        let mut s = self.state.lock().expect("lock");
        s.calls.push(format!("logs {name} follow={follow}"));
        Ok(s.logs_command.clone())
    }

    async fn find_running_catnip_container(&self) -> Option<RunningContainer> {
        self.state.lock().expect("lock").sibling.clone()
    }
}

// ── Canned probes ────────────────────────────────────────────────────────────

/// Version endpoint that answers with a fixed version, or is unreachable.
#[derive(Debug, Clone)]
pub struct FixedVersion(pub Option<&'static str>);

#[async_trait]
impl VersionProbe for FixedVersion {
    async fn fetch_version(&self) -> Result<String> {
        match self.0 {
            Some(version) => Ok(version.to_string()),
            None => anyhow::bail!("connection refused"),
        }
    }
}

/// Port probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPort(pub bool);

#[async_trait]
impl PortProbe for FixedPort {
    async fn is_reachable(&self, _port: u16) -> bool {
        self.0
    }
}
