//! Infrastructure implementation of the `ProcessSpawner` port.
//!
//! Two executors share the [`StreamingTask`] contract: [`execute_tty`] runs a
//! command on a pseudo-terminal and streams raw chunks, [`execute_piped`]
//! streams stdout and stderr line by line and hands back a kill switch.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::ports::{CommandSpec, ProcessSpawner};
use crate::application::stream::{
    ProcessExit, ProcessHandle, StreamSink, StreamingTask, SUCCESS_MESSAGE, TERMINAL_RESET,
};
use crate::domain::phase::Completion;

/// Largest raw terminal chunk pushed as one item.
pub const CHUNK_SIZE: usize = 1024;

/// Production `ProcessSpawner` backed by tokio processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessSpawner;

impl ProcessSpawner for TokioProcessSpawner {
    fn spawn_tty(&self, spec: &CommandSpec) -> StreamingTask<Vec<u8>, Completion> {
        execute_tty(spec)
    }

    fn spawn_piped(&self, spec: &CommandSpec) -> (StreamingTask<String, Completion>, ProcessHandle) {
        execute_piped(spec)
    }
}

fn build_command(spec: &CommandSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.dir {
        cmd.current_dir(dir);
    }
    cmd
}

fn verdict_for(status: std::io::Result<std::process::ExitStatus>) -> (Completion, String) {
    match status {
        Ok(status) if status.success() => (Completion::Success, SUCCESS_MESSAGE.to_string()),
        Ok(status) => (
            Completion::Failure,
            format!("Command failed with error: {status}\n"),
        ),
        Err(err) => (
            Completion::Failure,
            format!("Command failed with error: {err}\n"),
        ),
    }
}

// ── Terminal executor ─────────────────────────────────────────────────────────

/// Run `spec` attached to a pseudo-terminal and stream raw output chunks.
///
/// Progress bars only render on a terminal, so the environment also forces
/// colour and `BuildKit` output. Hosts without PTY support fall back to
/// merged pipes.
///
/// The process is not killed when the task is dropped; it runs to
/// completion with its output discarded.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn execute_tty(spec: &CommandSpec) -> StreamingTask<Vec<u8>, Completion> {
    let (sink, task) = StreamingTask::channel();
    debug!(command = %spec, "starting terminal stream");

    let mut cmd = build_command(spec);
    cmd.env("TERM", "xterm-256color")
        .env("DOCKER_BUILDKIT", "1")
        .env("FORCE_COLOR", "1")
        .env("CLICOLOR_FORCE", "1")
        .envs(spec.env.iter().cloned());

    match spawn_terminal(cmd, &spec.program, &sink.output) {
        Ok((child, readers)) => {
            tokio::spawn(supervise_terminal(child, readers, sink));
        }
        Err(err) => {
            warn!(command = %spec, error = %format!("{err:#}"), "failed to start command");
            sink.abandon_with([
                format!("Error: Failed to start command: {err:#}\n").into_bytes(),
                TERMINAL_RESET.as_bytes().to_vec(),
            ]);
        }
    }
    task
}

#[cfg(unix)]
fn spawn_terminal(
    cmd: Command,
    program: &str,
    output: &mpsc::Sender<Vec<u8>>,
) -> Result<(Child, Vec<JoinHandle<()>>)> {
    let (child, master) = super::pty::spawn(cmd, program)?;
    let output = output.clone();
    let reader = tokio::task::spawn_blocking(move || super::pty::pump(master, &output));
    Ok((child, vec![reader]))
}

#[cfg(not(unix))]
fn spawn_terminal(
    mut cmd: Command,
    program: &str,
    output: &mpsc::Sender<Vec<u8>>,
) -> Result<(Child, Vec<JoinHandle<()>>)> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_chunks(stdout, output.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_chunks(stderr, output.clone())));
    }
    Ok((child, readers))
}

#[cfg(not(unix))]
async fn forward_chunks<R: AsyncRead + Unpin>(mut reader: R, output: mpsc::Sender<Vec<u8>>) {
    use tokio::io::AsyncReadExt;

    let mut buf = [0u8; CHUNK_SIZE];
    let mut forwarding = true;
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if forwarding && output.send(buf[..n].to_vec()).await.is_err() {
                    forwarding = false;
                }
            }
        }
    }
}

async fn supervise_terminal(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    sink: StreamSink<Vec<u8>, Completion>,
) {
    let status = child.wait().await;
    for reader in readers {
        let _ = reader.await;
    }

    let (verdict, message) = verdict_for(status);
    debug!(?verdict, "terminal stream finished");

    let StreamSink { output, completion } = sink;
    let _ = output.send(message.into_bytes()).await;
    let _ = output.send(TERMINAL_RESET.as_bytes().to_vec()).await;
    let _ = completion.send(verdict);
}

// ── Piped executor ────────────────────────────────────────────────────────────

/// Run `spec` with separate stdout and stderr pipes, streaming lines.
///
/// Each pipe has its own reader feeding the shared queue; blank lines are
/// dropped. Killing through the handle (or dropping it) ends the stream
/// without a success or failure line.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn execute_piped(spec: &CommandSpec) -> (StreamingTask<String, Completion>, ProcessHandle) {
    let (sink, task) = StreamingTask::channel();
    let (handle, exit) = ProcessHandle::pair();
    debug!(command = %spec, "starting piped stream");

    let mut cmd = build_command(spec);
    let spawned = cmd
        .envs(spec.env.iter().cloned())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {}", spec.program));

    match spawned {
        Ok(mut child) => {
            let mut readers = Vec::with_capacity(2);
            if let Some(stdout) = child.stdout.take() {
                readers.push(tokio::spawn(forward_lines(stdout, sink.output.clone())));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(tokio::spawn(forward_lines(stderr, sink.output.clone())));
            }
            tokio::spawn(supervise_piped(child, readers, sink, exit));
        }
        Err(err) => {
            warn!(command = %spec, error = %format!("{err:#}"), "failed to start command");
            exit.mark_exited();
            sink.abandon_with([
                format!("Error: Failed to start command: {err:#}"),
                TERMINAL_RESET.to_string(),
            ]);
        }
    }
    (task, handle)
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, output: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if output.send(line).await.is_err() {
            break;
        }
    }
}

async fn supervise_piped(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    sink: StreamSink<String, Completion>,
    mut exit: ProcessExit,
) {
    let (status, killed) = tokio::select! {
        status = child.wait() => (status, false),
        () = exit.kill_requested() => {
            let _ = child.start_kill();
            (child.wait().await, true)
        }
    };
    exit.mark_exited();

    let StreamSink { output, completion } = sink;
    if killed {
        // Grandchildren may still hold the pipes open.
        for reader in readers {
            reader.abort();
        }
        debug!("piped stream killed");
        let _ = completion.send(Completion::Failure);
        let _ = output.send(TERMINAL_RESET.to_string()).await;
        return;
    }

    for reader in readers {
        let _ = reader.await;
    }
    let (verdict, message) = verdict_for(status);
    debug!(?verdict, "piped stream finished");
    let _ = output.send(message.trim_end().to_string()).await;
    let _ = output.send(TERMINAL_RESET.to_string()).await;
    let _ = completion.send(verdict);
}
