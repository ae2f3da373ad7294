// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sequential task pipelines, one per repository, gated by preconditions.

use std::path::PathBuf;

use crate::repo::RepoRef;

use super::task::Task;

/// Result of polling a precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionState {
    /// The group may start now.
    Fulfilled,
    /// Not yet; poll again later.
    NotFulfilled,
    /// Can never be satisfied; the group must be aborted unrun.
    Errored,
}

/// Gating predicate deciding when a group may start.
///
/// Parents are referenced by index into the session's group list, so
/// evaluation is a pure function of that list plus one filesystem
/// probe. It is polled arbitrarily often and has no side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Precondition {
    /// Always fulfilled.
    #[default]
    None,
    /// The parent group has finished, successfully or not.
    ParentFinished { parent: usize },
    /// The parent group has started and its target directory exists on
    /// disk. This orders nested clones without serializing them: the
    /// outer clone only needs to have created the containing directory,
    /// not completed its network transfer.
    ParentStartedAndDirExists { parent: usize, dir: PathBuf },
}

impl Precondition {
    /// Polls this precondition against the session's group ledger.
    #[must_use]
    pub fn evaluate(&self, groups: &[TaskGroup]) -> PreconditionState {
        match self {
            Self::None => PreconditionState::Fulfilled,
            Self::ParentFinished { parent } => {
                if groups[*parent].is_finished() {
                    PreconditionState::Fulfilled
                } else {
                    PreconditionState::NotFulfilled
                }
            }
            Self::ParentStartedAndDirExists { parent, dir } => {
                let parent = &groups[*parent];
                if parent.is_started() && dir.exists() {
                    PreconditionState::Fulfilled
                } else if parent.is_finished() {
                    // The parent will never create the directory now.
                    PreconditionState::Errored
                } else {
                    PreconditionState::NotFulfilled
                }
            }
        }
    }
}

/// The ordered command pipeline for one repository within a batch.
///
/// Tasks execute strictly in sequence; there is no parallelism within a
/// group and the caller-supplied order is never changed.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    description: String,
    repo: RepoRef,
    tasks: Vec<Task>,
    precondition: Precondition,
    started: bool,
    aborted: bool,
}

impl TaskGroup {
    /// Creates a group with no precondition.
    pub fn new(description: impl Into<String>, repo: RepoRef, tasks: Vec<Task>) -> Self {
        Self {
            description: description.into(),
            repo,
            tasks,
            precondition: Precondition::None,
            started: false,
            aborted: false,
        }
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the target repository.
    #[must_use]
    pub const fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Returns the tasks in execution order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub(super) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Returns the precondition.
    #[must_use]
    pub const fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    /// Replaces the precondition.
    pub fn set_precondition(&mut self, precondition: Precondition) {
        self.precondition = precondition;
    }

    /// Marks the group as started. Called by the session exactly once,
    /// just before the first task launches, so dependents polling
    /// "parent started" observe it without racing the first process.
    pub(super) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Returns true once the session has started this group.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Returns true when the group is aborted or every task is terminal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.aborted || self.tasks.iter().all(Task::is_finished)
    }

    /// Returns true when finished, not aborted, and every task reports
    /// success (ignored failures count as success).
    #[must_use]
    pub fn is_successful(&self) -> bool {
        !self.aborted && self.is_finished() && self.tasks.iter().all(Task::effective_success)
    }

    /// Returns true when aborted or any task failed without
    /// `ignore_failure`.
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.aborted
            || self
                .tasks
                .iter()
                .any(|t| t.is_finished() && !t.effective_success())
    }

    /// Returns whether the group was aborted.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Sets the aborted flag. Idempotent; a no-op on groups that
    /// already finished. Stopping an in-flight task is the session's
    /// job, this only finalizes the bookkeeping.
    pub fn abort(&mut self) {
        if self.aborted || self.is_finished() {
            return;
        }
        self.mark_aborted();
    }

    /// Session-side finalization of a group whose runner reported an
    /// abort. Unlike [`abort`](Self::abort) this applies even when the
    /// killed task already reached a terminal state.
    pub(super) fn mark_aborted(&mut self) {
        self.aborted = true;
        for task in &mut self.tasks {
            task.abort_before_start();
        }
    }
}
