//! Application service: watch a freshly started container until it is
//! healthy, stops, or runs out of time.
//!
//! The container's logs are followed while a poller checks the container and
//! its port. Both feed one [`StreamingTask`]; the verdict arrives on its
//! completion channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::ports::{CommandSpec, PortProbe, ProcessSpawner, RuntimeDriver};
use crate::application::stream::{
    ProcessHandle, ReadOutcome, StreamSink, StreamingTask, TERMINAL_RESET,
};
use crate::domain::health::{
    HealthOutcome, HealthPolicy, HealthState, UnhealthyReason, evaluate, past_grace,
};
use crate::domain::phase::Completion;

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthTarget {
    /// Container name.
    pub name: String,
    /// Host port that answers once the workspace is ready.
    pub port: u16,
}

/// A running health check: container logs plus status lines, then a verdict.
#[derive(Debug)]
pub struct MonitorTask {
    stream: StreamingTask<String, HealthOutcome>,
    follower_terminated: Arc<AtomicBool>,
}

impl MonitorTask {
    #[must_use]
    pub fn with_read_slice(mut self, read_slice: Duration) -> Self {
        self.stream = self.stream.with_read_slice(read_slice);
        self
    }

    /// Same contract as [`StreamingTask::read`].
    pub async fn read(&mut self) -> ReadOutcome<String, HealthOutcome> {
        self.stream.read().await
    }

    /// Whether the log follower process has exited.
    #[must_use]
    pub fn follower_terminated(&self) -> bool {
        self.follower_terminated.load(Ordering::SeqCst)
    }
}

/// Start monitoring `target`, following logs with `log_command`.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn monitor(
    driver: Arc<dyn RuntimeDriver>,
    probe: Arc<dyn PortProbe>,
    spawner: &dyn ProcessSpawner,
    log_command: &CommandSpec,
    target: HealthTarget,
    policy: HealthPolicy,
) -> MonitorTask {
    let (sink, stream) = StreamingTask::channel();
    let (follower, handle) = spawner.spawn_piped(log_command);
    let follower_terminated = handle.terminated_flag();
    debug!(container = %target.name, port = target.port, "health monitor started");

    let watch = Watch {
        driver,
        probe,
        target,
        policy,
    };
    tokio::spawn(watch.run(follower, handle, sink));

    MonitorTask {
        stream,
        follower_terminated,
    }
}

struct Watch {
    driver: Arc<dyn RuntimeDriver>,
    probe: Arc<dyn PortProbe>,
    target: HealthTarget,
    policy: HealthPolicy,
}

impl Watch {
    async fn run(
        self,
        follower: StreamingTask<String, Completion>,
        mut handle: ProcessHandle,
        sink: StreamSink<String, HealthOutcome>,
    ) {
        let StreamSink { output, completion } = sink;

        let watched = tokio::time::timeout(
            self.policy.overall_ceiling(),
            self.watch(follower, &output),
        )
        .await;
        let (outcome, message) = match watched {
            Ok(outcome) => (outcome, self.describe(outcome)),
            Err(_) => (
                HealthOutcome::Unhealthy(UnhealthyReason::TimedOut),
                format!(
                    "❌ Container startup timed out after {:?}",
                    self.policy.overall_ceiling()
                ),
            ),
        };
        match outcome {
            HealthOutcome::Healthy => info!(container = %self.target.name, "container healthy"),
            HealthOutcome::Unhealthy(reason) => {
                warn!(container = %self.target.name, %reason, "container unhealthy");
            }
        }

        // Kill before queueing: a stalled reader must not keep the follower alive.
        handle.kill().await;
        let _ = output.send(message).await;
        let _ = output.send(TERMINAL_RESET.to_string()).await;
        let _ = completion.send(outcome);
    }

    /// Forward log lines and poll until the outcome is settled.
    async fn watch(
        &self,
        mut follower: StreamingTask<String, Completion>,
        output: &mpsc::Sender<String>,
    ) -> HealthOutcome {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.policy.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut following = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(outcome) = self.check(started.elapsed()).await {
                        return outcome;
                    }
                }
                line = follower.recv(), if following => match line {
                    Some(line) => {
                        let _ = output.send(line).await;
                    }
                    None => {
                        debug!("log follower ended");
                        following = false;
                    }
                },
            }
        }
    }

    async fn check(&self, elapsed: Duration) -> Option<HealthOutcome> {
        let container_running = self.driver.is_container_running(&self.target.name).await;
        let port_reachable = container_running
            && past_grace(elapsed, &self.policy)
            && self.probe.is_reachable(self.target.port).await;
        evaluate(
            &HealthState {
                container_running,
                port_reachable,
                elapsed,
            },
            &self.policy,
        )
    }

    fn describe(&self, outcome: HealthOutcome) -> String {
        match outcome {
            HealthOutcome::Healthy => format!(
                "✅ Container is healthy and port {} is accessible",
                self.target.port
            ),
            HealthOutcome::Unhealthy(UnhealthyReason::StoppedUnexpectedly) => {
                format!("❌ Container {} stopped unexpectedly", self.target.name)
            }
            HealthOutcome::Unhealthy(UnhealthyReason::TimedOut) => format!(
                "⚠️ Container health check timed out after {:?}",
                self.policy.poll_ceiling()
            ),
        }
    }
}
