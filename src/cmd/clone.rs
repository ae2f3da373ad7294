// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Clone command: one task group per multigit repository entry,
//! preconditions wired from destination nesting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::batch::{Precondition, Task, TaskGroup, TaskKind, assign_clone_order};
use crate::cli::batch::CloneArgs;
use crate::config::Config;
use crate::error::Result;
use crate::manifest::{HeadType, MultigitFile, RepoSpec};
use crate::repo::RepoRef;

/// Main handler for the clone command.
///
/// # Errors
///
/// Returns an error if the multigit file cannot be loaded or if any
/// repository ends up failed or aborted.
pub async fn run_clone_command(args: &CloneArgs, config: &Config, dry: bool) -> Result<()> {
    let file = MultigitFile::load(&args.file)?;
    info!(
        file = %args.file.display(),
        repos = file.repos().len(),
        description = file.description(),
        "cloning multigit file"
    );

    let groups = build_clone_groups(&file, &args.dest, !args.no_post_clone);
    if dry {
        super::print_plan(&groups);
        return Ok(());
    }

    let group_count = groups.len();
    let outcome = super::drive_session(groups, config, args.keep_going).await?;
    sweep_staging(&args.dest, group_count);
    super::report_outcome(&outcome)
}

/// Removes staging directories left behind when a group failed or was
/// aborted before its own cleanup task ran.
pub fn sweep_staging(base: &Path, group_count: usize) {
    for index in 0..group_count {
        let staging = base.join(format!(".mgit-staging-{index}"));
        if staging.exists()
            && let Err(e) = std::fs::remove_dir_all(&staging)
        {
            warn!(path = %staging.display(), error = %e, "could not remove staging directory");
        }
    }
}

/// Builds the task groups for one multigit file, in file order, with
/// nested-clone preconditions assigned.
pub fn build_clone_groups(file: &MultigitFile, base: &Path, post_clone: bool) -> Vec<TaskGroup> {
    let mut groups = Vec::new();
    let mut dests = Vec::new();
    let mut seen = BTreeMap::<&str, (usize, usize)>::new();

    for (index, spec) in file.repos().iter().enumerate() {
        let claim = seen.get(spec.destination.as_str()).copied();
        // A later claimant of a taken destination surfaces at a
        // numbered sibling path instead of overwriting the first clone.
        let destination = match claim {
            Some((_, count)) => format!("{}-{}", spec.destination, count + 1),
            None => spec.destination.clone(),
        };
        let staging = claim.map(|_| base.join(format!(".mgit-staging-{index}")));
        groups.push(clone_group(spec, base, &destination, staging, file, post_clone));
        dests.push(destination);
        seen.entry(spec.destination.as_str())
            .and_modify(|(_, count)| *count += 1)
            .or_insert((index, 1));
    }

    assign_clone_order(&mut groups, &dests, base);

    // A duplicate claims its numbered path only once the first claim
    // settled, keeping the numbering stable in the final report.
    for (index, spec) in file.repos().iter().enumerate() {
        if let Some(&(first, _)) = seen.get(spec.destination.as_str())
            && first != index
        {
            groups[index].set_precondition(Precondition::ParentFinished { parent: first });
        }
    }

    groups
}

/// Builds the task sequence for one repository entry. `destination` is
/// the effective destination, already renumbered for duplicates.
fn clone_group(
    spec: &RepoSpec,
    base: &Path,
    destination: &str,
    staging: Option<PathBuf>,
    file: &MultigitFile,
    post_clone: bool,
) -> TaskGroup {
    let final_path = base.join(rel_path(destination));
    let name = spec
        .description
        .clone()
        .unwrap_or_else(|| leaf_name(destination));
    let repo = RepoRef::new(name, final_path.clone());

    let mut tasks = vec![Task::new(
        format!("{} -> {}", spec.url, destination),
        TaskKind::Comment,
    )];

    if let Some(staging) = staging {
        // Duplicate destination: clone into a staging directory, then
        // move to the numbered path once the first claim settled.
        let staged = staging.join(leaf_name(destination));
        tasks.push(clone_task(spec, &staged));
        tasks.push(Task::new(
            format!("move {destination} into place"),
            TaskKind::MoveDir {
                from: staged,
                to: final_path,
            },
        ));
        tasks.push(Task::new(
            "remove staging directory",
            TaskKind::DeleteDir { path: staging },
        ));
    } else {
        tasks.push(clone_task(spec, repo.path()));
    }

    // Branches are checked out by `clone --branch`; tags and commits
    // need an explicit detached checkout afterwards.
    if matches!(spec.head_type, HeadType::Tag | HeadType::Commit) {
        tasks.push(Task::git(
            format!("checkout {}", spec.head),
            ["checkout", spec.head.as_str(), "--"],
            true,
        ));
    }

    if post_clone {
        for argv in file.post_clone_commands() {
            tasks.push(Task::git(
                format!("post-clone: git {}", argv.join(" ")),
                argv.clone(),
                true,
            ));
        }
    }

    TaskGroup::new(format!("clone {destination}"), repo, tasks)
}

/// The clone task itself. Runs outside the repository, which does not
/// exist yet.
fn clone_task(spec: &RepoSpec, target: &Path) -> Task {
    let mut args = vec!["clone".to_string(), "--progress".to_string()];
    if spec.head_type == HeadType::Branch && !spec.head.is_empty() {
        args.push("--branch".to_string());
        args.push(spec.head.clone());
    }
    args.push(spec.url.clone());
    args.push(target.display().to_string());
    Task::git(format!("git clone {}", spec.url), args, false)
}

/// Splits a destination on its own delimiter and rebuilds it with the
/// platform separator.
fn rel_path(destination: &str) -> PathBuf {
    let delimiter = if destination.contains('/') { '/' } else { '\\' };
    destination
        .split(delimiter)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The final path segment of a destination.
fn leaf_name(destination: &str) -> String {
    let delimiter = if destination.contains('/') { '/' } else { '\\' };
    destination
        .split(delimiter)
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or(destination)
        .to_string()
}
