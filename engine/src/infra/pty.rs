//! Pseudo-terminal plumbing for [`super::streaming::execute_tty`].

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::process::Stdio;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::pty::{OpenptyResult, Winsize, openpty};
use nix::sys::termios::Termios;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use super::streaming::CHUNK_SIZE;

/// Spawn `cmd` with all three standard streams on a fresh terminal.
///
/// Returns the child and the master side. `cmd` is consumed so the parent's
/// copies of the slave descriptor are closed before the master is read;
/// otherwise the master never reports end-of-file.
pub(crate) fn spawn(mut cmd: Command, program: &str) -> Result<(Child, File)> {
    let OpenptyResult { master, slave } =
        openpty(None::<&Winsize>, None::<&Termios>).context("failed to open pseudo-terminal")?;

    let stdin = slave.try_clone().context("failed to duplicate terminal")?;
    let stdout = slave.try_clone().context("failed to duplicate terminal")?;
    let child = cmd
        .stdin(Stdio::from(stdin))
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(slave))
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;
    drop(cmd);

    Ok((child, File::from(master)))
}

/// Copy the master side into `output` in chunks until the terminal closes.
///
/// Blocking; run it on the blocking pool. Once the receiver is gone the
/// terminal keeps being drained so the child never stalls on a full buffer.
pub(crate) fn pump(mut master: File, output: &mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut forwarding = true;
    loop {
        match master.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if forwarding && output.blocking_send(buf[..n].to_vec()).is_err() {
                    debug!("terminal reader gone, discarding output");
                    forwarding = false;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            // Linux reports a hung-up terminal as EIO.
            Err(err) if err.raw_os_error() == Some(Errno::EIO as i32) => break,
            Err(err) => {
                debug!(error = %err, "terminal read failed");
                break;
            }
        }
    }
}
