// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Failure interaction protocol.
//!
//! When a task fails without `ignore_failure`, its group pauses and a
//! [`DecisionProvider`] is asked what to do. A GUI embedder would ask
//! the user; the shipped providers apply fixed or scripted policies so
//! the engine runs headless.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// The answer to "a task in this group just failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Record the failure and proceed to the next task.
    Continue,
    /// Discard the failed attempt and run the same task again.
    Retry,
    /// Finalize the group as aborted; remaining tasks never run.
    Abort,
    /// Acknowledge a failed *last* task and finish the group. Treated
    /// exactly like `Continue` by the engine, offered instead of it
    /// when no further task exists.
    Finish,
}

/// Everything a decision provider gets to see about a failure.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Repository display name.
    pub repo: String,
    /// Owning group description.
    pub group: String,
    /// Failed task description.
    pub task: String,
    /// Zero-based index of the failed task within its group.
    pub task_index: usize,
    /// Number of tasks in the group.
    pub task_count: usize,
    /// Exit code, possibly a sentinel.
    pub exit_code: i32,
    /// Captured merged output of the failed attempt.
    pub output: String,
}

impl FailureReport {
    /// Returns true when the failed task is the group's last, in which
    /// case `Finish` replaces `Continue` in the offered choices.
    #[must_use]
    pub const fn is_last_task(&self) -> bool {
        self.task_index + 1 >= self.task_count
    }
}

/// Pluggable source of failure decisions.
///
/// The session calls `decide` once per failed attempt and honors the
/// returned decision; it never knows whether a human or a policy
/// answered.
pub trait DecisionProvider: Send + Sync {
    fn decide(&self, report: FailureReport) -> BoxFuture<'_, FailureDecision>;
}

/// Aborts the failing group on the first error. The headless default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl DecisionProvider for AbortOnError {
    fn decide(&self, report: FailureReport) -> BoxFuture<'_, FailureDecision> {
        Box::pin(async move {
            warn!(repo = %report.repo, task = %report.task, exit_code = report.exit_code,
                "task failed, aborting group");
            FailureDecision::Abort
        })
    }
}

/// Records every failure but keeps going.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnError;

impl DecisionProvider for ContinueOnError {
    fn decide(&self, report: FailureReport) -> BoxFuture<'_, FailureDecision> {
        Box::pin(async move {
            warn!(repo = %report.repo, task = %report.task, exit_code = report.exit_code,
                "task failed, continuing");
            if report.is_last_task() {
                FailureDecision::Finish
            } else {
                FailureDecision::Continue
            }
        })
    }
}

/// Replays a fixed sequence of decisions, then aborts when exhausted.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    script: Mutex<VecDeque<FailureDecision>>,
}

impl ScriptedDecisions {
    /// Creates a provider that will answer with `decisions` in order.
    pub fn new(decisions: impl IntoIterator<Item = FailureDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().collect()),
        }
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&self, _report: FailureReport) -> BoxFuture<'_, FailureDecision> {
        let decision = self
            .script
            .lock()
            .map_or(FailureDecision::Abort, |mut script| {
                script.pop_front().unwrap_or(FailureDecision::Abort)
            });
        Box::pin(async move { decision })
    }
}

/// Forwards each failure over a channel and waits for the answer.
///
/// The session side blocks (cooperatively) in "awaiting decision" until
/// the receiving side replies through the provided oneshot. Dropping
/// the receiver, or the reply sender, resolves as `Abort`.
#[derive(Debug, Clone)]
pub struct ChannelDecisions {
    tx: mpsc::UnboundedSender<(FailureReport, oneshot::Sender<FailureDecision>)>,
}

impl ChannelDecisions {
    /// Creates the provider plus the receiving end an embedder drains.
    #[must_use]
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<(FailureReport, oneshot::Sender<FailureDecision>)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DecisionProvider for ChannelDecisions {
    fn decide(&self, report: FailureReport) -> BoxFuture<'_, FailureDecision> {
        let tx = self.tx.clone();
        Box::pin(async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            if tx.send((report, reply_tx)).is_err() {
                return FailureDecision::Abort;
            }
            reply_rx.await.unwrap_or(FailureDecision::Abort)
        })
    }
}
