// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exec command: one git subcommand fanned out across every
//! repository under a root.

use tracing::info;

use crate::batch::{Task, TaskGroup};
use crate::cli::batch::ExecArgs;
use crate::config::Config;
use crate::error::Result;
use crate::repo::{DiscoverOptions, RepoRef, discover_repos};

/// Main handler for the exec command.
///
/// # Errors
///
/// Returns an error if discovery fails or any repository ends up
/// failed or aborted.
pub async fn run_exec_command(args: &ExecArgs, config: &Config, dry: bool) -> Result<()> {
    let options = match args.max_depth {
        Some(depth) => DiscoverOptions::builder().with_max_depth(depth).build(),
        None => DiscoverOptions::default(),
    };
    let repos = discover_repos(&args.root, &options)?;
    if repos.is_empty() {
        println!("no repositories found under {}", args.root.display());
        return Ok(());
    }
    info!(
        repos = repos.len(),
        command = %args.args.join(" "),
        "running batch command"
    );

    let groups = build_exec_groups(&repos, &args.args);
    if dry {
        super::print_plan(&groups);
        return Ok(());
    }

    let outcome = super::drive_session(groups, config, args.keep_going).await?;
    super::report_outcome(&outcome)
}

/// One single-task group per repository; no preconditions, the
/// repositories already exist and are independent.
pub fn build_exec_groups(repos: &[RepoRef], git_args: &[String]) -> Vec<TaskGroup> {
    let command = git_args.join(" ");
    repos
        .iter()
        .map(|repo| {
            TaskGroup::new(
                format!("git {command} in {repo}"),
                repo.clone(),
                vec![Task::git(format!("git {command}"), git_args.to_vec(), true)],
            )
        })
        .collect()
}
