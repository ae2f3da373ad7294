// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The batch execution engine.
//!
//! ```text
//! caller builds one TaskGroup per repository
//!        |
//!        v
//! graph::assign_clone_order     nearest-ancestor preconditions
//!        |                      (nested clones start in order)
//!        v
//! session::BatchSession.run()
//!   scan groups in caller order
//!   cap concurrent groups, space out launches
//!   re-poll when blocked only by preconditions
//!        |                 \
//!        v                  v
//!   ProcessRunner        DecisionProvider
//!   (one git process     (Continue / Retry / Abort
//!    per running task)    on task failure)
//!        |
//!        v
//! report::BatchOutcome   per-repo status + counters + execution log
//! ```
//!
//! Failures of the work being executed are terminal states, never
//! errors; the engine always drives every group to finished, successful
//! or not, and always leaves a legible log.

pub mod decision;
pub mod graph;
pub mod group;
pub mod report;
pub mod session;
pub mod task;

pub use decision::{
    AbortOnError, ChannelDecisions, ContinueOnError, DecisionProvider, FailureDecision,
    FailureReport, ScriptedDecisions,
};
pub use graph::{DependencyGraphBuilder, assign_clone_order};
pub use group::{Precondition, PreconditionState, TaskGroup};
pub use report::{BatchCounters, BatchEvent, BatchOutcome, ExecutionLog, RepoOutcome};
pub use session::{BatchSession, LaunchPolicy, SessionConfig};
pub use task::{Task, TaskKind, TaskState};
