// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process execution with merged output capture.
//!
//! ```text
//! ProcessRunner
//!  • new/which
//!  • arg/args/cwd/name/flags/detector/stream_lines
//!        |
//!        +--> run(token).await      async, cancellable
//!        +--> run_blocking()        pre-flight checks only
//!              |
//!              v
//!        ProcessOutcome { exit_code, output, interrupted }
//!
//! Sentinel exit codes (always negative, never produced by git itself):
//!   LAUNCH_FAILED_EXIT   process could not be started
//!   SILENT_CRASH_EXIT    exit 0 but output matched a crash marker
//!   ABORTED_EXIT         killed through the cancellation token
//!
//! Non-zero exit codes are data, not errors: the runner classifies and
//! reports, the caller decides what to do about it.
//! ```

mod builder;
mod runner;

pub use builder::{CrashDetector, ProcessFlags, ProcessOutcome, ProcessRunner};

/// Sentinel exit code: the process could not be started at all.
pub const LAUNCH_FAILED_EXIT: i32 = -1000;

/// Sentinel exit code: the process reported success but its output
/// matched a known native-crash signature.
pub const SILENT_CRASH_EXIT: i32 = -1001;

/// Sentinel exit code: the process was killed through `abort`.
pub const ABORTED_EXIT: i32 = -1002;

#[cfg(test)]
mod tests;
