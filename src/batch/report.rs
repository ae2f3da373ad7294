// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session bookkeeping: counters, events, execution log, final outcome.

use std::fmt::Write as _;
use std::time::Duration;

/// Aggregate progress counters for one session.
///
/// Progress runs on a 3-unit-per-job scale: one unit when a job starts
/// and two more when it finishes, so in-flight work is visibly
/// distinguished from queued work. An empty batch is 100% immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounters {
    total: usize,
    started: usize,
    done: usize,
    errors: usize,
}

impl BatchCounters {
    /// Creates counters for `total` jobs.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            started: 0,
            done: 0,
            errors: 0,
        }
    }

    /// Total number of jobs in the session.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Jobs started so far (including finished ones).
    #[must_use]
    pub const fn started(&self) -> usize {
        self.started
    }

    /// Jobs finished so far. Non-decreasing; equals `total` exactly
    /// when the session terminates.
    #[must_use]
    pub const fn done(&self) -> usize {
        self.done
    }

    /// Jobs currently in flight.
    #[must_use]
    pub const fn running(&self) -> usize {
        self.started - self.done
    }

    /// Failed task attempts recorded so far (retries uncount).
    #[must_use]
    pub const fn errors(&self) -> usize {
        self.errors
    }

    /// Completion percentage on the 3-unit scale.
    #[must_use]
    pub const fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        let units = self.started + 2 * self.done;
        (units * 100 / (3 * self.total)) as u32
    }

    pub(super) const fn record_start(&mut self) {
        self.started += 1;
    }

    pub(super) const fn record_done(&mut self) {
        self.done += 1;
    }

    pub(super) const fn record_error(&mut self) {
        self.errors += 1;
    }

    /// A retry discards the failed attempt from the tally.
    pub(super) const fn uncount_error(&mut self) {
        self.errors = self.errors.saturating_sub(1);
    }
}

/// Notifications emitted by a running session, in order of occurrence.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A group left the queue and its first task is about to run.
    GroupStarted { group: usize, repo: String },
    /// One task began executing.
    TaskStarted {
        group: usize,
        task: usize,
        description: String,
    },
    /// A line of merged process output arrived (progressive display).
    TaskOutput { group: usize, task: usize, line: String },
    /// One task reached a terminal state. `success` is the effective
    /// outcome after `ignore_failure` coercion.
    TaskFinished {
        group: usize,
        task: usize,
        success: bool,
        exit_code: i32,
    },
    /// A failed task is waiting on a decision provider.
    AwaitingDecision { group: usize, task: usize },
    /// A group finished.
    GroupFinished {
        group: usize,
        success: bool,
        aborted: bool,
    },
    /// Counters changed.
    Progress(BatchCounters),
}

/// Plain-text, indentation-structured execution log.
///
/// Reproducible from the event stream alone; suitable for audit or
/// copy-to-clipboard display. One entry per line, indented two spaces
/// per level.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    lines: Vec<(u8, String)>,
}

impl ExecutionLog {
    /// Appends a line at the given indentation level.
    pub fn push(&mut self, level: u8, text: impl Into<String>) {
        self.lines.push((level, text.into()));
    }

    /// Appends captured process output, one log line per output line.
    pub fn push_output(&mut self, level: u8, output: &str) {
        for line in output.lines() {
            self.lines.push((level, line.to_string()));
        }
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the log as indented plain text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (level, text) in &self.lines {
            for _ in 0..*level {
                out.push_str("  ");
            }
            out.push_str(text);
            out.push('\n');
        }
        out
    }
}

/// Final status of one repository's group.
#[derive(Debug, Clone)]
pub struct RepoOutcome {
    /// Repository display name.
    pub repo: String,
    /// Group description.
    pub description: String,
    /// Effective success (ignored failures count as success).
    pub success: bool,
    /// Whether the group was aborted.
    pub aborted: bool,
}

impl RepoOutcome {
    /// One-line human status, always produced per repository.
    #[must_use]
    pub fn status_line(&self) -> String {
        let state = if self.aborted {
            "aborted"
        } else if self.success {
            "ok"
        } else {
            "failed"
        };
        format!("{}: {state}", self.repo)
    }
}

/// Result of a completed (or aborted) batch session.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Final counters.
    pub counters: BatchCounters,
    /// Per-repository outcomes, in group submission order.
    pub repos: Vec<RepoOutcome>,
    /// The merged execution log.
    pub log: ExecutionLog,
    /// Wall time from first launch to termination.
    pub duration: Duration,
    /// Whether a global abort cut the session short.
    pub aborted: bool,
}

impl BatchOutcome {
    /// True when nothing failed and nothing was aborted.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.aborted && self.repos.iter().all(|r| r.success)
    }

    /// Renders the per-repository status block appended to the log.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for repo in &self.repos {
            let _ = writeln!(out, "{}", repo.status_line());
        }
        let _ = writeln!(
            out,
            "{} of {} done, {} error(s), {:.1}s",
            self.counters.done(),
            self.counters.total(),
            self.counters.errors(),
            self.duration.as_secs_f64()
        );
        out
    }
}
