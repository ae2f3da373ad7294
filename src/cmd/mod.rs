// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers
//!   clone, exec, config
//! ```

pub mod clone;
pub mod config;
pub mod exec;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::warn;

use crate::batch::{
    AbortOnError, BatchOutcome, BatchSession, ContinueOnError, DecisionProvider, TaskGroup,
};
use crate::config::Config;
use crate::error::Result;

/// Runs one batch session over `groups` with the configured git stack,
/// aborting on Ctrl-C.
pub(crate) async fn drive_session(
    groups: Vec<TaskGroup>,
    config: &Config,
    keep_going: bool,
) -> Result<BatchOutcome> {
    let decisions: Arc<dyn DecisionProvider> = if keep_going {
        Arc::new(ContinueOnError)
    } else {
        Arc::new(AbortOnError)
    };
    let session = BatchSession::new(groups, config.session_config())
        .git_executable(&config.git.executable)
        .detector(config.crash_detector())
        .launch_policy(Arc::new(config.launch_policy()))
        .decisions(decisions);

    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, aborting batch");
            abort.cancel();
        }
    });

    session.run().await
}

/// Prints a finished session and converts partial failure into `Err`.
pub(crate) fn report_outcome(outcome: &BatchOutcome) -> Result<()> {
    print!("{}", outcome.summary());
    if outcome.aborted {
        anyhow::bail!("batch aborted");
    }
    let failed = outcome.repos.iter().filter(|r| !r.success).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} repositories failed", outcome.repos.len());
    }
    Ok(())
}

/// Prints what a dry run would execute.
pub(crate) fn print_plan(groups: &[TaskGroup]) {
    for group in groups {
        println!("{}", group.description());
        for task in group.tasks() {
            println!("  {}", task.description());
        }
    }
}
