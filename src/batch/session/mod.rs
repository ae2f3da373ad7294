// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The batch scheduler.
//!
//! ```text
//! BatchSession::run()
//!   |
//!   | scan groups in caller order
//!   |   precondition NotFulfilled -> tally blocked, skip
//!   |   precondition Errored      -> finalize aborted, never run
//!   |   Fulfilled + budget free   -> wait out the launch gap
//!   |                                (still applying runner events),
//!   |                                then spawn a group runner
//!   |
//!   | wait: runner event | global abort | rescan timer
//!   |   the timer only arms when groups are blocked purely by
//!   |   unmet preconditions, since nothing else may wake us
//!   |
//!   v
//! every group finished -> BatchOutcome
//! ```
//!
//! The session owns the group ledger; spawned runners never touch it
//! and instead report [`RunnerMsg`] events over a channel. Precondition
//! polling therefore reads one consistent ledger plus the filesystem.
//!
//! A global abort cancels running groups in reverse start order, so a
//! dependent never observes its parent aborting first and races the
//! scheduler into starting it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bon::Builder;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::process::{CrashDetector, ProcessFlags, ProcessOutcome, ProcessRunner};
use crate::error::{ProcessError, Result};
use crate::repo::RepoRef;

use super::decision::{AbortOnError, DecisionProvider, FailureDecision, FailureReport};
use super::group::{PreconditionState, TaskGroup};
use super::report::{BatchCounters, BatchEvent, BatchOutcome, ExecutionLog, RepoOutcome};
use super::task::TaskKind;

/// Tuning knobs for one session.
///
/// The launch interval and rescan interval are workarounds for
/// observed external-tool races, not algorithmic constants; they stay
/// configurable and are never re-derived.
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    /// Maximum concurrently running groups (0 = unlimited).
    #[builder(setters(name = with_max_concurrent), default = 0)]
    max_concurrent: usize,
    /// Minimum spacing between successive process launches.
    #[builder(setters(name = with_launch_interval), default = Duration::from_millis(200))]
    launch_interval: Duration,
    /// Re-poll interval when groups are blocked purely by preconditions.
    #[builder(setters(name = with_rescan_interval), default = Duration::from_secs(1))]
    rescan_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    /// Returns the concurrency cap (0 = unlimited).
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the inter-launch spacing.
    #[must_use]
    pub const fn launch_interval(&self) -> Duration {
        self.launch_interval
    }

    /// Returns the blocked re-poll interval.
    #[must_use]
    pub const fn rescan_interval(&self) -> Duration {
        self.rescan_interval
    }
}

/// Output markers identifying an authentication failure.
const AUTH_MARKERS: [&str; 3] = [
    "Authentication failed",
    "could not read Username",
    "Permission denied (publickey",
];

/// Cross-group launch veto: after too many authentication failures,
/// stop issuing new network commands instead of prompting (or failing)
/// once per remaining repository.
///
/// Explicitly injected and shared by `Arc`, never a process-wide
/// global; sessions that want independent budgets get their own.
#[derive(Debug)]
pub struct LaunchPolicy {
    limit: u32,
    auth_failures: AtomicU32,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LaunchPolicy {
    /// Creates a policy tripping after `limit` auth failures (0 = never).
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            auth_failures: AtomicU32::new(0),
        }
    }

    /// Creates a policy that never trips.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self::new(0)
    }

    /// Returns whether new network commands may still launch.
    #[must_use]
    pub fn permits_network(&self) -> bool {
        self.limit == 0 || self.auth_failures.load(Ordering::Relaxed) < self.limit
    }

    /// Returns the number of authentication failures observed.
    #[must_use]
    pub fn auth_failures(&self) -> u32 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Inspects failed-command output for authentication markers.
    pub fn observe(&self, output: &str) {
        if AUTH_MARKERS.iter().any(|m| output.contains(m)) {
            let seen = self.auth_failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(auth_failures = seen, "authentication failure observed");
        }
    }
}

/// Returns true when the git arguments describe a network operation.
fn is_network_command(args: &[String]) -> bool {
    args.first().is_some_and(|sub| {
        matches!(
            sub.as_str(),
            "clone" | "fetch" | "pull" | "push" | "ls-remote"
        )
    })
}

/// Event reported by a group runner back to the session loop.
#[derive(Debug)]
enum RunnerMsg {
    TaskStarted {
        group: usize,
        task: usize,
    },
    TaskFinished {
        group: usize,
        task: usize,
        success: bool,
        exit_code: i32,
        output: String,
    },
    TaskRetried {
        group: usize,
        task: usize,
    },
    GroupFinished {
        group: usize,
        aborted: bool,
    },
}

/// A spawned group runner, in start order.
struct Running {
    group: usize,
    token: CancellationToken,
}

/// Immutable snapshot of one task handed to a runner.
#[derive(Debug, Clone)]
struct TaskSpec {
    description: String,
    kind: TaskKind,
    ignore_failure: bool,
}

/// Everything a runner needs, detached from the ledger.
struct GroupPlan {
    index: usize,
    repo: RepoRef,
    description: String,
    tasks: Vec<TaskSpec>,
}

/// Shared runner context.
struct RunnerCtx {
    git: PathBuf,
    detector: CrashDetector,
    decisions: Arc<dyn DecisionProvider>,
    policy: Arc<LaunchPolicy>,
    msg_tx: mpsc::UnboundedSender<RunnerMsg>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

/// Mutable session state: the ledger and its bookkeeping.
struct SessionState {
    groups: Vec<TaskGroup>,
    counters: BatchCounters,
    log: ExecutionLog,
    running: Vec<Running>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl SessionState {
    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn all_finished(&self) -> bool {
        self.groups.iter().all(TaskGroup::is_finished)
    }

    /// Finalizes a never-started group as aborted without running it.
    fn finalize_unstarted(&mut self, index: usize, reason: &str) {
        debug!(group = index, reason, "finalizing group without execution");
        self.groups[index].abort();
        self.counters.record_start();
        self.counters.record_done();
        let repo = self.groups[index].repo().name().to_string();
        self.log.push(0, format!("{repo}: aborted ({reason})"));
        self.emit(BatchEvent::GroupFinished {
            group: index,
            success: false,
            aborted: true,
        });
        self.emit(BatchEvent::Progress(self.counters));
    }

    /// Applies one runner event to the ledger.
    fn apply(&mut self, msg: RunnerMsg) {
        match msg {
            RunnerMsg::TaskStarted { group, task } => {
                if let Err(e) = self.groups[group].tasks_mut()[task].begin() {
                    warn!(error = %e, "runner event out of order");
                }
                let description = self.groups[group].tasks()[task].description().to_string();
                self.log.push(1, description.clone());
                self.emit(BatchEvent::TaskStarted {
                    group,
                    task,
                    description,
                });
            }
            RunnerMsg::TaskFinished {
                group,
                task,
                success,
                exit_code,
                output,
            } => {
                let effective = self.groups[group].tasks_mut()[task].finish(success);
                if !output.is_empty() {
                    self.log.push_output(2, &output);
                }
                if !success {
                    self.counters.record_error();
                    self.log.push(2, format!("failed (exit {exit_code})"));
                }
                self.emit(BatchEvent::TaskFinished {
                    group,
                    task,
                    success: effective,
                    exit_code,
                });
                self.emit(BatchEvent::Progress(self.counters));
            }
            RunnerMsg::TaskRetried { group, task } => {
                if let Err(e) = self.groups[group].tasks_mut()[task].reset_for_retry() {
                    warn!(error = %e, "retry event out of order");
                }
                self.counters.uncount_error();
                self.log.push(2, "retrying");
                self.emit(BatchEvent::Progress(self.counters));
            }
            RunnerMsg::GroupFinished { group, aborted } => {
                if aborted {
                    self.groups[group].mark_aborted();
                }
                self.counters.record_done();
                self.running.retain(|r| r.group != group);
                let success = self.groups[group].is_successful();
                let repo = self.groups[group].repo().name().to_string();
                let state = if aborted {
                    "aborted"
                } else if success {
                    "ok"
                } else {
                    "failed"
                };
                self.log.push(0, format!("{repo}: {state}"));
                self.emit(BatchEvent::GroupFinished {
                    group,
                    success,
                    aborted,
                });
                self.emit(BatchEvent::Progress(self.counters));
            }
        }
    }
}

/// One batch operation: drives a set of task groups to completion
/// under a concurrency cap, honoring preconditions.
///
/// The session owns its groups exclusively; a fresh session is built
/// for every batch operation.
pub struct BatchSession {
    groups: Vec<TaskGroup>,
    config: SessionConfig,
    git: PathBuf,
    detector: CrashDetector,
    decisions: Arc<dyn DecisionProvider>,
    policy: Arc<LaunchPolicy>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
    abort: CancellationToken,
}

impl BatchSession {
    /// Creates a session over `groups` with the headless defaults:
    /// `git` from PATH, default crash markers, abort-on-first-error.
    #[must_use]
    pub fn new(groups: Vec<TaskGroup>, config: SessionConfig) -> Self {
        Self {
            groups,
            config,
            git: PathBuf::from("git"),
            detector: CrashDetector::default(),
            decisions: Arc::new(AbortOnError),
            policy: Arc::new(LaunchPolicy::default()),
            events: None,
            abort: CancellationToken::new(),
        }
    }

    /// Sets the git executable (resolved path or PATH-relative name).
    #[must_use]
    pub fn git_executable(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    /// Sets the crash-signature detector applied to every git process.
    #[must_use]
    pub fn detector(mut self, detector: CrashDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the failure decision provider.
    #[must_use]
    pub fn decisions(mut self, decisions: Arc<dyn DecisionProvider>) -> Self {
        self.decisions = decisions;
        self
    }

    /// Sets the shared network-launch policy.
    #[must_use]
    pub fn launch_policy(mut self, policy: Arc<LaunchPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Streams [`BatchEvent`]s to the given channel as they occur.
    #[must_use]
    pub fn events(mut self, tx: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Returns a handle that aborts the whole session when cancelled.
    #[must_use]
    pub fn abort_handle(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Drives every group to a terminal state and reports the outcome.
    ///
    /// Work failures never surface as `Err`; they end up in the
    /// outcome. `Err` means the session could not start at all.
    ///
    /// # Errors
    ///
    /// Fails when git work is present but no git executable is
    /// configured.
    pub async fn run(mut self) -> Result<BatchOutcome> {
        let needs_git = self.groups.iter().any(|g| {
            g.tasks()
                .iter()
                .any(|t| matches!(t.kind(), TaskKind::Git { .. }))
        });
        if needs_git && self.git.as_os_str().is_empty() {
            return Err(crate::error::MgError::from(ProcessError::ExecutableNotFound {
                name: "git".to_string(),
            })
            .into());
        }

        let total = self.groups.len();
        info!(total, cap = self.config.max_concurrent(), "batch session starting");

        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<RunnerMsg>();
        let mut state = SessionState {
            groups: std::mem::take(&mut self.groups),
            counters: BatchCounters::new(total),
            log: ExecutionLog::default(),
            running: Vec::new(),
            events: self.events.clone(),
        };
        let start = Instant::now();
        let mut next_launch_at = Instant::now();
        let mut abort_handled = false;

        // A group built with no tasks is terminal from birth and never
        // passes through a runner, so its progress units are recorded
        // here; done still reaches total at termination.
        for index in 0..state.groups.len() {
            if state.groups[index].is_finished() {
                state.counters.record_start();
                state.counters.record_done();
                let repo = state.groups[index].repo().name().to_string();
                state.log.push(0, format!("{repo}: ok (no tasks)"));
                state.emit(BatchEvent::GroupFinished {
                    group: index,
                    success: state.groups[index].is_successful(),
                    aborted: false,
                });
                state.emit(BatchEvent::Progress(state.counters));
            }
        }

        'main: loop {
            if state.all_finished() && state.running.is_empty() {
                break;
            }

            if self.abort.is_cancelled() && !abort_handled {
                abort_handled = true;
                warn!("global abort requested");
                // Reverse start order: dependents die before the jobs
                // they were waiting on.
                for running in state.running.iter().rev() {
                    running.token.cancel();
                }
                for index in 0..state.groups.len() {
                    if !state.groups[index].is_started() && !state.groups[index].is_finished() {
                        state.finalize_unstarted(index, "batch aborted");
                    }
                }
                continue;
            }

            let mut blocked = 0usize;
            let mut cap_hit = false;
            if !self.abort.is_cancelled() {
                let mut index = 0;
                while index < state.groups.len() {
                    if state.groups[index].is_started() || state.groups[index].is_finished() {
                        index += 1;
                        continue;
                    }
                    let verdict = state.groups[index].precondition().evaluate(&state.groups);
                    match verdict {
                        PreconditionState::NotFulfilled => blocked += 1,
                        PreconditionState::Errored => {
                            state.finalize_unstarted(index, "dependency failed");
                        }
                        PreconditionState::Fulfilled => {
                            let cap = self.config.max_concurrent();
                            if cap != 0 && state.running.len() >= cap {
                                cap_hit = true;
                                break;
                            }
                            if !self.policy.permits_network()
                                && group_needs_network(&state.groups[index])
                            {
                                state.finalize_unstarted(
                                    index,
                                    "network commands disabled after repeated authentication failures",
                                );
                                index += 1;
                                continue;
                            }
                            // Space out launches without going deaf to
                            // runner events or the abort handle.
                            while Instant::now() < next_launch_at {
                                tokio::select! {
                                    () = time::sleep_until(next_launch_at) => {}
                                    Some(msg) = msg_rx.recv() => state.apply(msg),
                                    () = self.abort.cancelled() => continue 'main,
                                }
                            }
                            if state.groups[index].is_finished() {
                                index += 1;
                                continue;
                            }
                            self.launch(index, &mut state, &msg_tx);
                            next_launch_at = Instant::now() + self.config.launch_interval();
                        }
                    }
                    index += 1;
                }
            }

            if state.all_finished() && state.running.is_empty() {
                break;
            }

            // A blocked group's precondition can become fulfilled with
            // no completion event to wake us (the parent's directory
            // appears mid-task), hence the timer.
            let budget_free = self.config.max_concurrent() == 0
                || state.running.len() < self.config.max_concurrent();
            let repoll = blocked > 0 && budget_free && !cap_hit && !self.abort.is_cancelled();
            tokio::select! {
                Some(msg) = msg_rx.recv() => state.apply(msg),
                () = self.abort.cancelled(), if !abort_handled => {}
                () = time::sleep(self.config.rescan_interval()), if repoll => {}
            }
        }

        let counters = state.counters;
        let repos: Vec<RepoOutcome> = state
            .groups
            .iter()
            .map(|g| RepoOutcome {
                repo: g.repo().name().to_string(),
                description: g.description().to_string(),
                success: g.is_successful(),
                aborted: g.is_aborted(),
            })
            .collect();
        let errors = counters.errors();
        info!(done = counters.done(), errors, aborted = abort_handled, "batch session finished");

        Ok(BatchOutcome {
            counters,
            repos,
            log: state.log,
            duration: start.elapsed(),
            aborted: abort_handled,
        })
    }

    /// Spawns the runner for one group.
    fn launch(
        &self,
        index: usize,
        state: &mut SessionState,
        msg_tx: &mpsc::UnboundedSender<RunnerMsg>,
    ) {
        state.groups[index].mark_started();
        state.counters.record_start();
        let group = &state.groups[index];
        let repo = group.repo().clone();
        debug!(group = index, repo = %repo, "starting group");
        state.log.push(0, group.description().to_string());
        state.emit(BatchEvent::GroupStarted {
            group: index,
            repo: repo.name().to_string(),
        });
        state.emit(BatchEvent::Progress(state.counters));

        let plan = GroupPlan {
            index,
            repo,
            description: group.description().to_string(),
            tasks: group
                .tasks()
                .iter()
                .map(|t| TaskSpec {
                    description: t.description().to_string(),
                    kind: t.kind().clone(),
                    ignore_failure: t.ignores_failure(),
                })
                .collect(),
        };
        let ctx = RunnerCtx {
            git: self.git.clone(),
            detector: self.detector.clone(),
            decisions: Arc::clone(&self.decisions),
            policy: Arc::clone(&self.policy),
            msg_tx: msg_tx.clone(),
            events: self.events.clone(),
        };
        let token = CancellationToken::new();
        tokio::spawn(run_group(plan, ctx, token.clone()));
        state.running.push(Running {
            group: index,
            token,
        });
    }
}

/// Returns true when any task in the group hits the network.
fn group_needs_network(group: &TaskGroup) -> bool {
    group.tasks().iter().any(|t| match t.kind() {
        TaskKind::Git { args, .. } => is_network_command(args),
        _ => false,
    })
}

/// Executes one group's tasks strictly in sequence, reporting progress
/// over the message channel. Runs detached from the ledger.
async fn run_group(plan: GroupPlan, ctx: RunnerCtx, token: CancellationToken) {
    let group = plan.index;
    let total = plan.tasks.len();
    let mut index = 0;
    while index < total {
        if token.is_cancelled() {
            let _ = ctx.msg_tx.send(RunnerMsg::GroupFinished {
                group,
                aborted: true,
            });
            return;
        }

        let spec = &plan.tasks[index];
        let _ = ctx.msg_tx.send(RunnerMsg::TaskStarted { group, task: index });

        let outcome = execute_task(spec, &plan, &ctx, &token, index).await;
        let success = outcome.success();
        let interrupted = outcome.is_interrupted();
        let exit_code = outcome.exit_code();
        let output = outcome.into_output();
        let _ = ctx.msg_tx.send(RunnerMsg::TaskFinished {
            group,
            task: index,
            success,
            exit_code,
            output: output.clone(),
        });

        if interrupted {
            let _ = ctx.msg_tx.send(RunnerMsg::GroupFinished {
                group,
                aborted: true,
            });
            return;
        }
        if success || spec.ignore_failure {
            index += 1;
            continue;
        }

        if matches!(spec.kind, TaskKind::Git { .. }) {
            ctx.policy.observe(&output);
        }

        if let Some(events) = &ctx.events {
            let _ = events.send(BatchEvent::AwaitingDecision { group, task: index });
        }
        let report = FailureReport {
            repo: plan.repo.name().to_string(),
            group: plan.description.clone(),
            task: spec.description.clone(),
            task_index: index,
            task_count: total,
            exit_code,
            output,
        };
        let decision = tokio::select! {
            decision = ctx.decisions.decide(report) => decision,
            () = token.cancelled() => FailureDecision::Abort,
        };
        match decision {
            FailureDecision::Continue | FailureDecision::Finish => index += 1,
            FailureDecision::Retry => {
                let _ = ctx.msg_tx.send(RunnerMsg::TaskRetried { group, task: index });
            }
            FailureDecision::Abort => {
                let _ = ctx.msg_tx.send(RunnerMsg::GroupFinished {
                    group,
                    aborted: true,
                });
                return;
            }
        }
    }
    let _ = ctx.msg_tx.send(RunnerMsg::GroupFinished {
        group,
        aborted: false,
    });
}

/// Runs one task to completion, normalizing every kind to a
/// [`ProcessOutcome`].
async fn execute_task(
    spec: &TaskSpec,
    plan: &GroupPlan,
    ctx: &RunnerCtx,
    token: &CancellationToken,
    task: usize,
) -> ProcessOutcome {
    match &spec.kind {
        TaskKind::Comment => ProcessOutcome::new(0, String::new(), false),
        TaskKind::Git { args, inside_repo } => {
            let mut runner = ProcessRunner::new(&ctx.git)
                .args(args)
                .detector(ctx.detector.clone())
                .flags(ProcessFlags::FORWARD_TO_LOG | ProcessFlags::ALLOW_ERRORS)
                .name(plan.repo.name());
            if *inside_repo {
                runner = runner.cwd(plan.repo.path());
            }
            if let Some(events) = &ctx.events {
                let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
                let events = events.clone();
                let group = plan.index;
                tokio::spawn(async move {
                    while let Some(line) = line_rx.recv().await {
                        let _ = events.send(BatchEvent::TaskOutput { group, task, line });
                    }
                });
                runner = runner.stream_lines(line_tx);
            }
            runner.run(token.clone()).await
        }
        TaskKind::MoveDir { from, to } => {
            let (from, to) = (from.clone(), to.clone());
            blocking_fs(move || std::fs::rename(&from, &to)).await
        }
        TaskKind::DeleteDir { path } => {
            let path = path.clone();
            blocking_fs(move || std::fs::remove_dir_all(&path)).await
        }
    }
}

/// Runs a filesystem operation on the blocking pool and maps the
/// result to an outcome.
async fn blocking_fs<F>(op: F) -> ProcessOutcome
where
    F: FnOnce() -> std::io::Result<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(())) => ProcessOutcome::new(0, String::new(), false),
        Ok(Err(e)) => ProcessOutcome::new(1, e.to_string(), false),
        Err(e) => ProcessOutcome::new(1, format!("worker failed: {e}"), false),
    }
}

#[cfg(test)]
mod tests;
