// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process execution and lifecycle management.
//!
//! ```text
//! run(token) / run_blocking()
//!        |
//!        v
//!    build_command()
//!    args, cwd, stdio
//!        |
//!        v
//!      spawn()  --fail--> LAUNCH_FAILED_EXIT
//!        |
//!    reader tasks (stdout, stderr)
//!    mpsc channel merges lines in arrival order
//!        |
//!    wait (or kill on token cancel --> ABORTED_EXIT)
//!        |
//!    crash-marker check on exit 0 --> SILENT_CRASH_EXIT
//!        |
//!        v
//!    ProcessOutcome
//! ```

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use super::builder::{ProcessFlags, ProcessOutcome, ProcessRunner};
use super::{ABORTED_EXIT, LAUNCH_FAILED_EXIT, SILENT_CRASH_EXIT};

impl ProcessRunner {
    /// Returns the display name for this process.
    fn display_name(&self) -> String {
        self.name_override().map_or_else(
            || {
                self.program().file_stem().map_or_else(
                    || "process".to_string(),
                    |s| s.to_string_lossy().into_owned(),
                )
            },
            String::from,
        )
    }

    /// Returns the full command line as a string (for logging).
    fn command_line(&self) -> String {
        let mut cmd = format!("{}", self.program().display());
        for arg in self.args_slice() {
            use std::fmt::Write as _;
            if arg.contains(' ') {
                let _ = write!(cmd, " \"{arg}\"");
            } else {
                let _ = write!(cmd, " {arg}");
            }
        }
        cmd
    }

    /// Spawns the process and drives it to completion.
    ///
    /// Stdout and stderr are merged line-by-line in arrival order. Each
    /// line reaches the streaming channel (if configured) before the
    /// final outcome is produced. Cancelling the token kills the process
    /// immediately; the outcome then carries [`ABORTED_EXIT`] and
    /// `interrupted = true`.
    ///
    /// Never fails: launch problems are reported as
    /// [`LAUNCH_FAILED_EXIT`] in the outcome, per the engine's rule that
    /// process failures are states, not errors.
    pub async fn run(self, token: CancellationToken) -> ProcessOutcome {
        let name = self.display_name();
        let cmd_line = self.command_line();

        if token.is_cancelled() {
            return ProcessOutcome::new(ABORTED_EXIT, String::new(), true);
        }

        if let Some(cwd) = self.working_dir() {
            debug!(cwd = %cwd.display(), "cd");
        }
        debug!(cmd = %cmd_line, "exec");

        let mut command = self.build_command();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                if !self.process_flags().contains(ProcessFlags::ALLOW_ERRORS) {
                    error!(process = %name, error = %e, "failed to start process");
                }
                return ProcessOutcome::new(
                    LAUNCH_FAILED_EXIT,
                    format!("failed to start: {cmd_line}: {e}"),
                    false,
                );
            }
        };

        trace!(process = %name, pid = ?child.id(), "spawned");

        // One channel merges both streams in arrival order.
        let (tx, mut rx) = mpsc::channel::<String>(256);
        let stdout_reader = child.stdout.take().map(|s| spawn_line_reader(s, tx.clone()));
        let stderr_reader = child.stderr.take().map(|s| spawn_line_reader(s, tx));

        let mut output = String::new();
        let mut rx_open = true;
        let mut interrupted = false;

        let status = loop {
            tokio::select! {
                maybe_line = rx.recv(), if rx_open => {
                    match maybe_line {
                        Some(line) => self.consume_line(&name, line, &mut output),
                        None => rx_open = false,
                    }
                }
                status = child.wait() => break status,
                () = token.cancelled(), if !interrupted => {
                    warn!(process = %name, "abort requested, killing process");
                    interrupted = true;
                    let _ = child.start_kill();
                }
            }
        };

        // Readers flush their remaining buffered lines at pipe EOF.
        while let Some(line) = rx.recv().await {
            self.consume_line(&name, line, &mut output);
        }
        if let Some(handle) = stdout_reader {
            let _ = handle.await;
        }
        if let Some(handle) = stderr_reader {
            let _ = handle.await;
        }

        let mut exit_code = if interrupted {
            ABORTED_EXIT
        } else {
            match status {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    error!(process = %name, error = %e, "failed waiting for process");
                    LAUNCH_FAILED_EXIT
                }
            }
        };

        if exit_code == 0 && self.crash_detector().matches(&output) {
            warn!(process = %name, "output matched a crash signature, overriding exit code");
            exit_code = SILENT_CRASH_EXIT;
        }

        if exit_code != 0
            && !interrupted
            && !self.process_flags().contains(ProcessFlags::ALLOW_ERRORS)
        {
            error!(process = %name, exit_code, "process failed");
        }

        trace!(process = %name, exit_code, interrupted, "completed");
        ProcessOutcome::new(exit_code, output, interrupted)
    }

    /// Runs the process synchronously, blocking the calling thread.
    ///
    /// Reserved for pre-flight checks where a result is needed before
    /// proceeding. Output is merged as full-stream stdout followed by
    /// stderr rather than interleaved by line.
    #[must_use]
    pub fn run_blocking(self) -> ProcessOutcome {
        let name = self.display_name();
        let cmd_line = self.command_line();
        debug!(cmd = %cmd_line, "exec (blocking)");

        let mut command = std::process::Command::new(self.program());
        command.args(self.args_slice());
        if let Some(cwd) = self.working_dir() {
            command.current_dir(cwd);
        }
        command.stdin(Stdio::null());

        let raw = match command.output() {
            Ok(raw) => raw,
            Err(e) => {
                if !self.process_flags().contains(ProcessFlags::ALLOW_ERRORS) {
                    error!(process = %name, error = %e, "failed to start process");
                }
                return ProcessOutcome::new(
                    LAUNCH_FAILED_EXIT,
                    format!("failed to start: {cmd_line}: {e}"),
                    false,
                );
            }
        };

        let mut output = String::from_utf8_lossy(&raw.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&raw.stderr);
        if !stderr.trim().is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&stderr);
        }

        let mut exit_code = raw.status.code().unwrap_or(-1);
        if exit_code == 0 && self.crash_detector().matches(&output) {
            warn!(process = %name, "output matched a crash signature, overriding exit code");
            exit_code = SILENT_CRASH_EXIT;
        }

        if exit_code != 0 && !self.process_flags().contains(ProcessFlags::ALLOW_ERRORS) {
            error!(process = %name, exit_code, "process failed");
        }

        ProcessOutcome::new(exit_code, output, false)
    }

    /// Appends one merged line to the captured output and fans it out
    /// to observers.
    fn consume_line(&self, name: &str, line: String, output: &mut String) {
        if self.process_flags().contains(ProcessFlags::FORWARD_TO_LOG) {
            trace!(process = %name, line = %line, "output");
        }
        if let Some(tx) = self.line_sender() {
            let _ = tx.send(line.clone());
        }
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&line);
    }

    /// Builds the tokio Command from this runner's configuration.
    fn build_command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.args_slice());
        if let Some(cwd) = self.working_dir() {
            command.current_dir(cwd);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        // Kill on drop so an aborted batch never leaks git processes.
        command.kill_on_drop(true);
        command
    }
}

/// Spawns a task reading lines from one stream into the merge channel.
fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    })
}
