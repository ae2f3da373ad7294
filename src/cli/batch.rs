// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Arguments for the batch commands.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the clone command.
#[derive(Debug, Clone, Args)]
pub struct CloneArgs {
    /// Path to the multigit file describing the repositories.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory the repositories are cloned into.
    #[arg(short = 'd', long = "dest", value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,

    /// Keep cloning the remaining repositories when one fails.
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// Skips the multigit file's post-clone commands.
    #[arg(long = "no-post-clone")]
    pub no_post_clone: bool,
}

/// Arguments for the exec command.
#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Root directory searched for git repositories.
    #[arg(short = 'C', long = "root", value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Maximum directory depth searched for repositories.
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Keep running on the remaining repositories when one fails.
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// Git arguments, e.g. `mgit exec -- fetch --all`.
    #[arg(value_name = "GIT_ARGS", trailing_var_arg = true, required = true)]
    pub args: Vec<String>,
}
