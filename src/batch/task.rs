// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The atomic unit of batch work.

use std::path::PathBuf;

use crate::error::BatchError;

/// What a task does when it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Run the git executable with the given arguments.
    ///
    /// `inside_repo == false` leaves the working directory alone, which
    /// is required for `clone` since the repository does not exist yet.
    Git { args: Vec<String>, inside_repo: bool },
    /// Move a directory (rename). Delegated to a blocking worker.
    MoveDir { from: PathBuf, to: PathBuf },
    /// Delete a directory tree. Delegated to a blocking worker.
    DeleteDir { path: PathBuf },
    /// No-op marker, present purely for log readability.
    Comment,
}

/// Task lifecycle state. Transitions are monotonic; the only path back
/// to `NotStarted` is an explicit [`Task::reset_for_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    NotStarted,
    Started,
    Successful,
    Errored,
}

impl TaskState {
    /// Returns true for `Successful` and `Errored`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Errored)
    }
}

/// One atomic operation against one repository.
#[derive(Debug, Clone)]
pub struct Task {
    description: String,
    kind: TaskKind,
    ignore_failure: bool,
    state: TaskState,
}

impl Task {
    /// Creates a task in the `NotStarted` state.
    pub fn new(description: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            description: description.into(),
            kind,
            ignore_failure: false,
            state: TaskState::NotStarted,
        }
    }

    /// Shorthand for a git-command task.
    pub fn git<I, S>(description: impl Into<String>, args: I, inside_repo: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            description,
            TaskKind::Git {
                args: args.into_iter().map(Into::into).collect(),
                inside_repo,
            },
        )
    }

    /// Marks failures of this task as tolerable: the outcome reported
    /// upstream is coerced to success while the internal state stays
    /// `Errored` for logging.
    #[must_use]
    pub const fn with_ignore_failure(mut self, ignore: bool) -> Self {
        self.ignore_failure = ignore;
        self
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Returns whether failures are coerced to success.
    #[must_use]
    pub const fn ignores_failure(&self) -> bool {
        self.ignore_failure
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns true once the task has left `NotStarted`.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        !matches!(self.state, TaskState::NotStarted)
    }

    /// Returns true once the task reached a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns the outcome as seen by upstream consumers: `Errored`
    /// counts as success when `ignore_failure` is set.
    #[must_use]
    pub const fn effective_success(&self) -> bool {
        match self.state {
            TaskState::Successful => true,
            TaskState::Errored => self.ignore_failure,
            TaskState::NotStarted | TaskState::Started => false,
        }
    }

    /// Transitions `NotStarted` to `Started`.
    ///
    /// # Errors
    ///
    /// Starting a task twice is programmer misuse, not a work failure,
    /// and is the one place the engine returns `Err` mid-batch.
    pub fn begin(&mut self) -> Result<(), BatchError> {
        if self.state != TaskState::NotStarted {
            return Err(BatchError::TaskRestarted {
                description: self.description.clone(),
            });
        }
        self.state = TaskState::Started;
        Ok(())
    }

    /// Records the terminal outcome and returns the success value to
    /// propagate upstream (coerced by `ignore_failure`).
    pub fn finish(&mut self, success: bool) -> bool {
        self.state = if success {
            TaskState::Successful
        } else {
            TaskState::Errored
        };
        success || self.ignore_failure
    }

    /// Discards a terminal state so the task can run again.
    ///
    /// # Errors
    ///
    /// Fails unless the task is in a terminal state.
    pub fn reset_for_retry(&mut self) -> Result<(), BatchError> {
        if !self.state.is_terminal() {
            return Err(BatchError::TaskNotTerminal {
                description: self.description.clone(),
            });
        }
        self.state = TaskState::NotStarted;
        Ok(())
    }

    /// Finalizes a never-started task as errored ("aborted before
    /// started"). No-op in any other state.
    pub fn abort_before_start(&mut self) {
        if self.state == TaskState::NotStarted {
            self.state = TaskState::Errored;
        }
    }
}
