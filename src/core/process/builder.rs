// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process runner configuration.

use bitflags::bitflags;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::ProcessError;

bitflags! {
    /// Flags controlling process execution behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcessFlags: u32 {
        /// Forward each captured output line to tracing logs.
        const FORWARD_TO_LOG = 0x01;
        /// Non-zero exits are expected here; don't log them as errors.
        const ALLOW_ERRORS = 0x02;
    }
}

/// Detector for native tools that crash while still exiting 0.
///
/// Some git helper binaries print a crash banner and stack trace but
/// report success through their exit code. When any configured marker
/// appears in the merged output of a zero-exit process, the exit code
/// is rewritten to [`super::SILENT_CRASH_EXIT`] before anything
/// downstream can mistake the run for a success.
#[derive(Debug, Clone)]
pub struct CrashDetector {
    markers: Vec<String>,
}

impl Default for CrashDetector {
    fn default() -> Self {
        // Markers observed in the wild; override via `git.crash_markers`.
        Self::new(vec!["add_item".to_string(), "Stack trace:".to_string()])
    }
}

impl CrashDetector {
    /// Creates a detector matching the given literal markers.
    #[must_use]
    pub const fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// Creates a detector that never matches.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    /// Returns true if the output contains any crash marker.
    #[must_use]
    pub fn matches(&self, output: &str) -> bool {
        self.markers.iter().any(|m| output.contains(m))
    }

    /// Returns the configured markers.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

/// Outcome of a completed (or failed-to-start) process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    exit_code: i32,
    output: String,
    interrupted: bool,
}

impl ProcessOutcome {
    pub(crate) const fn new(exit_code: i32, output: String, interrupted: bool) -> Self {
        Self {
            exit_code,
            output,
            interrupted,
        }
    }

    /// Returns the exit code (0 = success, negative = sentinel).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns the merged stdout+stderr text.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes self, returning the merged output text.
    #[must_use]
    pub fn into_output(self) -> String {
        self.output
    }

    /// Returns whether the process was killed through `abort`.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns true if the process exited successfully (code 0 after
    /// sentinel corrections).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builder for configuring and running one external process.
#[derive(Debug)]
pub struct ProcessRunner {
    /// Path to the executable.
    program: PathBuf,
    /// Command-line arguments.
    args: Vec<String>,
    /// Working directory.
    cwd: Option<PathBuf>,
    /// Process flags.
    flags: ProcessFlags,
    /// Crash-signature detector applied to zero-exit runs.
    detector: CrashDetector,
    /// Optional channel receiving each merged output line as it arrives.
    line_tx: Option<mpsc::UnboundedSender<String>>,
    /// Display name for logging.
    name: Option<String>,
}

impl ProcessRunner {
    /// Creates a new `ProcessRunner` for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            flags: ProcessFlags::FORWARD_TO_LOG,
            detector: CrashDetector::disabled(),
            line_tx: None,
            name: None,
        }
    }

    /// Creates a `ProcessRunner` after resolving the program via PATH.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessError::ExecutableNotFound` if the executable is
    /// not found in PATH.
    pub fn which(program: &str) -> std::result::Result<Self, ProcessError> {
        which::which(program).map_or_else(
            |_| {
                Err(ProcessError::ExecutableNotFound {
                    name: program.to_string(),
                })
            },
            |path| Ok(Self::new(path)),
        )
    }

    /// Adds an argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Adds multiple arguments to the command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string_lossy().into_owned());
        }
        self
    }

    /// Sets the working directory for the process.
    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets process flags.
    #[must_use]
    pub const fn flags(mut self, flags: ProcessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a process flag.
    #[must_use]
    pub fn flag(mut self, flag: ProcessFlags) -> Self {
        self.flags |= flag;
        self
    }

    /// Sets the crash-signature detector.
    #[must_use]
    pub fn detector(mut self, detector: CrashDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Streams each merged output line to the given channel as it
    /// arrives, before the final outcome is produced.
    #[must_use]
    pub fn stream_lines(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.line_tx = Some(tx);
        self
    }

    /// Sets a display name for logging.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    // Getters for field access within the process module

    /// Returns a reference to the program path.
    #[must_use]
    pub const fn program(&self) -> &PathBuf {
        &self.program
    }

    pub(super) fn args_slice(&self) -> &[String] {
        &self.args
    }

    pub(super) const fn working_dir(&self) -> Option<&PathBuf> {
        self.cwd.as_ref()
    }

    pub(super) const fn process_flags(&self) -> ProcessFlags {
        self.flags
    }

    pub(super) const fn crash_detector(&self) -> &CrashDetector {
        &self.detector
    }

    pub(super) const fn line_sender(&self) -> Option<&mpsc::UnboundedSender<String>> {
        self.line_tx.as_ref()
    }

    pub(super) fn name_override(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
