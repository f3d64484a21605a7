//! Application service: the initialization state machine.
//!
//! [`LifecycleEngine`] drives one [`LifecycleRequest`] from the first running
//! check to a healthy (or failed) container. The caller pumps it with
//! [`LifecycleEngine::next`], which performs at most one bounded wait and
//! hands back one upward message at a time. Every background result is fed
//! through [`transition`] as a [`LifecycleEvent`].

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::cancel::CancelFlag;
use crate::application::ports::{
    CommandSpec, PortProbe, ProcessSpawner, RuntimeDriver, VersionProbe,
};
use crate::application::services::compatibility::{VersionReport, check_upgrade};
use crate::application::services::container_start::start_container;
use crate::application::services::decision::{DecideContext, decide};
use crate::application::services::health_monitor::{HealthTarget, MonitorTask, monitor};
use crate::application::stream::{ReadOutcome, StreamingTask};
use crate::application::timed::TimedDriver;
use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::health::{HealthOutcome, UnhealthyReason};
use crate::domain::phase::{Action, Completion, LifecycleEvent, LifecyclePhase, transition};
use crate::domain::request::{DEV_IMAGE, LifecycleRequest};

/// Ports the engine runs against.
#[derive(Clone)]
pub struct EngineDeps {
    pub driver: Arc<dyn RuntimeDriver>,
    pub versions: Arc<dyn VersionProbe>,
    pub ports: Arc<dyn PortProbe>,
    pub processes: Arc<dyn ProcessSpawner>,
}

/// Upward notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// Headline and detail for the current step.
    Status { text: String, action: String },
    /// One line of container log or health output.
    OutputLine(String),
    /// Raw bytes from a pull or build running on a terminal.
    TerminalOutput(Vec<u8>),
    /// A container is up; health monitoring follows.
    Started { container: String },
    /// Initialization finished successfully.
    Healthy { container: String },
    /// Result of the post-start version check.
    VersionChecked(VersionReport),
    /// Initialization finished unsuccessfully.
    Failed { message: String },
}

/// Result of one [`LifecycleEngine::next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Message(EngineMessage),
    /// Background work is still running; call again.
    Idle,
    /// Nothing more will happen.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launch {
    Pull,
    Build,
    Logs,
}

impl Launch {
    fn what(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Build => "build",
            Self::Logs => "logs",
        }
    }
}

#[derive(Debug, Default)]
enum Work {
    #[default]
    NotStarted,
    Idle,
    Job(JoinHandle<LifecycleEvent>),
    Launching(Launch, JoinHandle<Result<CommandSpec>>),
    Stream(StreamingTask<Vec<u8>, Completion>),
    Health(MonitorTask),
    VersionCheck(JoinHandle<VersionReport>),
    Done,
}

/// Drives one initialization attempt.
pub struct LifecycleEngine {
    request: Arc<LifecycleRequest>,
    config: EngineConfig,
    deps: EngineDeps,
    cancel: CancelFlag,
    phase: LifecyclePhase,
    work: Work,
    outbox: VecDeque<EngineMessage>,
    container: String,
    image_refreshed: bool,
}

impl LifecycleEngine {
    /// Create an engine; nothing runs until the first [`next`](Self::next).
    ///
    /// Status queries made through `deps.driver` are bounded by
    /// `config.timeouts.status`.
    #[must_use]
    pub fn new(
        request: LifecycleRequest,
        config: EngineConfig,
        deps: EngineDeps,
        cancel: CancelFlag,
    ) -> Self {
        let driver: Arc<dyn RuntimeDriver> = Arc::new(TimedDriver::new(
            Arc::clone(&deps.driver),
            config.timeouts.status(),
        ));
        let container = request.container_name.clone();
        Self {
            request: Arc::new(request),
            config,
            deps: EngineDeps { driver, ..deps },
            cancel,
            phase: LifecyclePhase::CheckingRunning,
            work: Work::NotStarted,
            outbox: VecDeque::new(),
            container,
            image_refreshed: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Name of the container in use; differs from the request when a
    /// compatible sibling was reused.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Stop starting new work. Processes already running are left alone.
    pub fn request_quit(&self) {
        self.cancel.cancel();
    }

    /// Advance the engine by at most one bounded wait.
    ///
    /// Queued messages are returned first. Otherwise the current background
    /// work is polled for up to the configured read slice.
    pub async fn next(&mut self) -> Step {
        if let Some(message) = self.outbox.pop_front() {
            return Step::Message(message);
        }
        if self.cancel.is_cancelled() && !self.phase.is_terminal() {
            self.abandon();
        } else if let Some(event) = self.poll_work().await {
            self.work = Work::Idle;
            self.apply(event);
        }
        match self.outbox.pop_front() {
            Some(message) => Step::Message(message),
            None if matches!(self.work, Work::Done) => Step::Finished,
            None => Step::Idle,
        }
    }

    /// Poll the current work once. `Some` when it produced an event.
    async fn poll_work(&mut self) -> Option<LifecycleEvent> {
        let slice = self.config.timeouts.read_slice();
        match &mut self.work {
            Work::NotStarted => {
                self.begin();
                None
            }
            Work::Idle | Work::Done => None,
            Work::Job(handle) => match tokio::time::timeout(slice, handle).await {
                Err(_elapsed) => None,
                Ok(Ok(event)) => Some(event),
                Ok(Err(err)) => Some(LifecycleEvent::Aborted {
                    reason: format!("background task failed: {err}"),
                }),
            },
            Work::Launching(launch, handle) => {
                let launch = *launch;
                let polled = tokio::time::timeout(slice, handle).await;
                match polled {
                    Err(_elapsed) => None,
                    Ok(Ok(Ok(command))) => self.launch(launch, &command),
                    Ok(Ok(Err(err))) => Some(LifecycleEvent::Aborted {
                        reason: EngineError::CommandUnavailable {
                            what: launch.what(),
                            reason: format!("{err:#}"),
                        }
                        .to_string(),
                    }),
                    Ok(Err(err)) => Some(LifecycleEvent::Aborted {
                        reason: format!("background task failed: {err}"),
                    }),
                }
            }
            Work::Stream(task) => match task.read().await {
                ReadOutcome::Item(bytes) => {
                    self.outbox.push_back(EngineMessage::TerminalOutput(bytes));
                    None
                }
                ReadOutcome::Idle => None,
                ReadOutcome::Finished(verdict) => Some(LifecycleEvent::StreamFinished(
                    verdict.unwrap_or(Completion::Failure),
                )),
            },
            Work::Health(task) => match task.read().await {
                ReadOutcome::Item(line) => {
                    self.outbox.push_back(EngineMessage::OutputLine(line));
                    None
                }
                ReadOutcome::Idle => None,
                ReadOutcome::Finished(verdict) => Some(LifecycleEvent::HealthResolved(
                    verdict.unwrap_or(HealthOutcome::Unhealthy(UnhealthyReason::StoppedUnexpectedly)),
                )),
            },
            Work::VersionCheck(handle) => match tokio::time::timeout(slice, handle).await {
                Err(_elapsed) => None,
                Ok(result) => {
                    if let Ok(report) = result {
                        self.outbox.push_back(EngineMessage::VersionChecked(report));
                    }
                    self.work = Work::Done;
                    None
                }
            },
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    fn begin(&mut self) {
        info!(
            container = %self.request.container_name,
            image = %self.request.image,
            dev_mode = self.request.dev_mode,
            "initialization started"
        );
        self.work = Work::Idle;
        if !self.may_start_work() {
            return;
        }
        let driver = Arc::clone(&self.deps.driver);
        let request = Arc::clone(&self.request);
        self.work = Work::Job(tokio::spawn(async move {
            let running = driver.is_container_running(&request.container_name).await;
            LifecycleEvent::RunningChecked { running }
        }));
    }

    fn apply(&mut self, event: LifecycleEvent) {
        let previous = self.phase;
        let next = transition(previous, &event);
        if next != previous {
            info!(from = %previous, to = %next, "phase changed");
        }
        self.phase = next;

        match event {
            LifecycleEvent::RunningChecked { running: true } => {
                self.status("Container already running", "Connecting to existing instance");
                self.ready();
            }
            LifecycleEvent::RunningChecked { running: false } => self.enter_deciding(),
            LifecycleEvent::Decided(decision) => {
                self.status(&decision.status, &decision.current_action);
                match decision.action {
                    Action::None => self.fail(decision.status),
                    Action::SkipToReady => self.ready(),
                    Action::Pull(image) => {
                        let driver = Arc::clone(&self.deps.driver);
                        self.prepare(Launch::Pull, async move { driver.pull_image(&image).await });
                    }
                    Action::Build(source_root) => {
                        let driver = Arc::clone(&self.deps.driver);
                        self.prepare(Launch::Build, async move {
                            driver.build_dev_image(&source_root).await
                        });
                    }
                    Action::StartContainer => self.enter_starting(),
                }
            }
            LifecycleEvent::StreamFinished(Completion::Success) => {
                self.image_refreshed = true;
                self.enter_deciding();
            }
            LifecycleEvent::StreamFinished(Completion::Failure) => {
                self.fail(EngineError::StreamFailed.to_string());
            }
            LifecycleEvent::ContainerStarted { name } => {
                self.container = name;
                self.outbox.push_back(EngineMessage::Started {
                    container: self.container.clone(),
                });
                self.status("Container started, checking health...", "Monitoring container startup...");
                let driver = Arc::clone(&self.deps.driver);
                let container = self.container.clone();
                self.prepare(Launch::Logs, async move {
                    driver.container_logs(&container, true).await
                });
            }
            LifecycleEvent::StartFailed { message } => self.fail(message),
            LifecycleEvent::HealthResolved(outcome) => {
                if outcome.is_healthy() {
                    self.ready();
                } else {
                    self.fail(EngineError::Unhealthy.to_string());
                }
            }
            LifecycleEvent::Aborted { reason } => self.fail(reason),
        }
    }

    /// Cancellation check made before any new work is spawned.
    fn may_start_work(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.abandon();
            return false;
        }
        true
    }

    /// Drop the current work without killing anything and fail.
    fn abandon(&mut self) {
        debug!(phase = %self.phase, "initialization cancelled");
        self.work = Work::Idle;
        self.apply(LifecycleEvent::Aborted {
            reason: EngineError::Cancelled.to_string(),
        });
    }

    fn enter_deciding(&mut self) {
        if !self.may_start_work() {
            return;
        }
        let driver = Arc::clone(&self.deps.driver);
        let request = Arc::clone(&self.request);
        let ctx = DecideContext {
            quit_requested: self.cancel.is_cancelled(),
            image_refreshed: self.image_refreshed,
        };
        self.work = Work::Job(tokio::spawn(async move {
            let decision = decide(driver.as_ref(), &request, &ctx).await;
            if ctx.image_refreshed {
                let missing = match &decision.action {
                    Action::Pull(image) => Some((image.clone(), "pull")),
                    Action::Build(_) => Some((DEV_IMAGE.to_string(), "build")),
                    _ => None,
                };
                if let Some((image, step)) = missing {
                    return LifecycleEvent::Aborted {
                        reason: EngineError::ImageStillMissing { image, step }.to_string(),
                    };
                }
            }
            LifecycleEvent::Decided(decision)
        }));
    }

    fn enter_starting(&mut self) {
        if !self.may_start_work() {
            return;
        }
        let driver = Arc::clone(&self.deps.driver);
        let versions = Arc::clone(&self.deps.versions);
        let request = Arc::clone(&self.request);
        let timeouts = self.config.timeouts;
        self.work = Work::Job(tokio::spawn(async move {
            LifecycleEvent::from(
                start_container(driver.as_ref(), versions.as_ref(), &request, &timeouts).await,
            )
        }));
    }

    /// Fetch the command for `launch` in the background.
    fn prepare<F>(&mut self, launch: Launch, command: F)
    where
        F: Future<Output = Result<CommandSpec>> + Send + 'static,
    {
        if !self.may_start_work() {
            return;
        }
        self.work = Work::Launching(launch, tokio::spawn(command));
    }

    /// Start the prepared command. Returns an event only on cancellation.
    fn launch(&mut self, launch: Launch, command: &CommandSpec) -> Option<LifecycleEvent> {
        if self.cancel.is_cancelled() {
            return Some(LifecycleEvent::Aborted {
                reason: EngineError::Cancelled.to_string(),
            });
        }
        let slice = self.config.timeouts.read_slice();
        debug!(what = launch.what(), %command, "launching");
        self.work = match launch {
            Launch::Pull | Launch::Build => {
                Work::Stream(self.deps.processes.spawn_tty(command).with_read_slice(slice))
            }
            Launch::Logs => {
                let target = HealthTarget {
                    name: self.container.clone(),
                    port: self.request.health_port,
                };
                let task = monitor(
                    Arc::clone(&self.deps.driver),
                    Arc::clone(&self.deps.ports),
                    self.deps.processes.as_ref(),
                    command,
                    target,
                    self.config.health,
                );
                Work::Health(task.with_read_slice(slice))
            }
        };
        None
    }

    // ── Terminal states ───────────────────────────────────────────────────────

    fn ready(&mut self) {
        info!(container = %self.container, "initialization complete");
        self.outbox.push_back(EngineMessage::Healthy {
            container: self.container.clone(),
        });
        let versions = Arc::clone(&self.deps.versions);
        let cli_version = self.request.version.clone();
        let limit = self.config.timeouts.version_check();
        self.work = Work::VersionCheck(tokio::spawn(async move {
            check_upgrade(versions.as_ref(), &cli_version, limit).await
        }));
    }

    fn fail(&mut self, message: String) {
        warn!(phase = %self.phase, %message, "initialization failed");
        self.outbox.push_back(EngineMessage::Failed { message });
        self.work = Work::Done;
    }

    fn status(&mut self, text: &str, action: &str) {
        self.outbox.push_back(EngineMessage::Status {
            text: text.to_string(),
            action: action.to_string(),
        });
    }
}
