//! Stream primitives shared by process executors and the health monitor.
//!
//! A [`StreamingTask`] is a bounded output queue fed by background workers,
//! plus a completion verdict delivered on a separate one-shot channel.
//! Readers poll with [`StreamingTask::read`], which never waits longer than
//! its read slice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

/// Items buffered before producers block.
pub const QUEUE_CAPACITY: usize = 100;

/// Longest a single [`StreamingTask::read`] waits by default.
pub const DEFAULT_READ_SLICE: Duration = Duration::from_millis(100);

/// Pushed after a command exits with status 0.
pub const SUCCESS_MESSAGE: &str = "✅ Command completed successfully!\n";

/// Restores attributes, line wrapping and cursor visibility.
pub const TERMINAL_RESET: &str = "\x1b[0m\x1b[?7h\x1b[?25h";

// ── Reader side ───────────────────────────────────────────────────────────────

/// Result of one bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T, C> {
    /// Next queued item.
    Item(T),
    /// Nothing arrived within the read slice; ask again later.
    Idle,
    /// Queue closed. `None` means the worker ended without a verdict.
    Finished(Option<C>),
}

/// A running background stream: output queue plus completion verdict.
#[derive(Debug)]
pub struct StreamingTask<T, C> {
    output: mpsc::Receiver<T>,
    completion: oneshot::Receiver<C>,
    verdict: Option<Option<C>>,
    read_slice: Duration,
}

/// Producer half handed to workers.
///
/// Workers push every item, then send the verdict, then drop the sink; the
/// reader therefore sees the verdict as soon as the queue reports closed.
#[derive(Debug)]
pub struct StreamSink<T, C> {
    pub output: mpsc::Sender<T>,
    pub completion: oneshot::Sender<C>,
}

impl<T, C> StreamSink<T, C> {
    /// Queue a few final items and drop the verdict sender unused.
    ///
    /// Used when the worker could not even start.
    pub fn abandon_with(self, items: impl IntoIterator<Item = T>) {
        let Self { output, completion } = self;
        // Fresh queue: capacity is guaranteed for a handful of items.
        for item in items {
            let _ = output.try_send(item);
        }
        drop(completion);
    }
}

impl<T, C: Clone> StreamingTask<T, C> {
    /// A connected sink and task.
    #[must_use]
    pub fn channel() -> (StreamSink<T, C>, Self) {
        let (output_tx, output_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let task = Self {
            output: output_rx,
            completion: done_rx,
            verdict: None,
            read_slice: DEFAULT_READ_SLICE,
        };
        let sink = StreamSink {
            output: output_tx,
            completion: done_tx,
        };
        (sink, task)
    }

    /// Override how long [`read`](Self::read) may wait.
    #[must_use]
    pub fn with_read_slice(mut self, read_slice: Duration) -> Self {
        self.read_slice = read_slice;
        self
    }

    /// One receive bounded by the read slice.
    ///
    /// Once the queue is closed the completion is checked exactly once,
    /// without waiting, and the same [`ReadOutcome::Finished`] is returned
    /// from then on.
    pub async fn read(&mut self) -> ReadOutcome<T, C> {
        if let Some(verdict) = &self.verdict {
            return ReadOutcome::Finished(verdict.clone());
        }
        match tokio::time::timeout(self.read_slice, self.output.recv()).await {
            Ok(Some(item)) => ReadOutcome::Item(item),
            Ok(None) => {
                let verdict = self.completion.try_recv().ok();
                self.verdict = Some(verdict.clone());
                ReadOutcome::Finished(verdict)
            }
            Err(_) => ReadOutcome::Idle,
        }
    }

    /// Unbounded receive, for forwarders running on their own task.
    pub async fn recv(&mut self) -> Option<T> {
        self.output.recv().await
    }
}

// ── Process handle ────────────────────────────────────────────────────────────

/// Kill switch for a process whose output is being streamed.
///
/// Dropping the handle kills the process too.
#[derive(Debug)]
pub struct ProcessHandle {
    kill: Option<oneshot::Sender<()>>,
    exited: Option<oneshot::Receiver<()>>,
    terminated: Arc<AtomicBool>,
}

/// Supervisor half of a [`ProcessHandle`].
#[derive(Debug)]
pub struct ProcessExit {
    kill: oneshot::Receiver<()>,
    exited: oneshot::Sender<()>,
    terminated: Arc<AtomicBool>,
}

impl ProcessExit {
    /// Resolves on a kill request or when the handle is dropped.
    ///
    /// Await it at most once.
    pub async fn kill_requested(&mut self) {
        let _ = (&mut self.kill).await;
    }

    /// Record that the process has been reaped and wake any waiting killer.
    pub fn mark_exited(self) {
        self.terminated.store(true, Ordering::SeqCst);
        let _ = self.exited.send(());
    }
}

impl ProcessHandle {
    /// A handle and the supervisor half that serves it.
    #[must_use]
    pub fn pair() -> (Self, ProcessExit) {
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exited_tx, exited_rx) = oneshot::channel();
        let terminated = Arc::new(AtomicBool::new(false));
        let handle = Self {
            kill: Some(kill_tx),
            exited: Some(exited_rx),
            terminated: Arc::clone(&terminated),
        };
        let exit = ProcessExit {
            kill: kill_rx,
            exited: exited_tx,
            terminated,
        };
        (handle, exit)
    }

    /// Kill the process and wait until it has been reaped.
    ///
    /// Returns immediately if the process already exited or never started.
    pub async fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        if let Some(exited) = self.exited.take() {
            let _ = exited.await;
        }
    }

    /// Whether the process has exited.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Shared flag that flips once the process has exited.
    #[must_use]
    pub fn terminated_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminated)
    }
}
