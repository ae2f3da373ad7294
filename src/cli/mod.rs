// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for mgit-rs using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! mgit [global options] <command>
//! clone <multigit-file>
//! exec -- <git args...>
//! options
//! configs
//! version
//! ```

pub mod batch;
pub mod global;

#[cfg(test)]
mod tests;

use clap::{Parser, Subcommand};

use crate::cli::batch::{CloneArgs, ExecArgs};
use crate::cli::global::GlobalOptions;

/// Multi-repository Git batch tool.
#[derive(Debug, Parser)]
#[command(
    name = "mgit",
    author,
    version,
    about = "Multi-repository Git batch tool",
    long_about = "mgit-rs Copyright (C) 2026 The mgit-rs authors\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Clones groups of repositories described by a multigit file\n\
                  (nested clones start in dependency order) and batch-runs git\n\
                  subcommands across many existing clones. See\n\
                  `mgit <command> --help` for more information about a command.",
    after_help = "CONFIG FILES:\n\n\
                  By default, mgit loads `mgit.toml` from the current directory\n\
                  when present. Additional TOML files can be specified with\n\
                  --config and are loaded afterwards, each overriding the\n\
                  previous. MGIT_* environment variables and command-line flags\n\
                  override all files."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their values from the config files.
    Options,

    /// Lists the config files used by mgit.
    Configs,

    /// Clones the repositories described by a multigit file.
    Clone(CloneArgs),

    /// Runs one git subcommand across every repository under a root.
    Exec(ExecArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
///
/// # Errors
///
/// Returns a clap error when the arguments do not parse.
pub fn try_parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
