// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Global CLI options available for all commands.
//!
//! # Option Precedence
//!
//! ```text
//! --config FILE       ← Additional config files (can repeat)
//! --dry               ← Print commands without launching anything
//! --log-level N       ← Console verbosity (0-5)
//! --file-log-level N  ← File verbosity (overrides --log-level)
//! --max-procs N       ← batch.max_concurrent override
//! --git PATH          ← git.executable override
//!
//! Precedence: CLI flags > MGIT_* env > --config > mgit.toml > defaults
//! ```

use clap::Args;
use std::path::PathBuf;

use crate::config::loader::ConfigLoader;
use crate::error::Result;

/// Global options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Path to additional TOML configuration file(s).
    /// Can be specified multiple times.
    #[arg(short = 'c', long = "config", value_name = "FILE", action = clap::ArgAction::Append)]
    pub configs: Vec<PathBuf>,

    /// Prints the commands that would run without launching anything.
    #[arg(long)]
    pub dry: bool,

    /// Console log level (0=silent, 1=errors, 2=warnings, 3=info, 4=debug, 5=trace).
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=5)
    )]
    pub log_level: Option<u8>,

    /// File log level, overrides --log-level for the log file.
    #[arg(long = "file-log-level", value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=5)
    )]
    pub file_log_level: Option<u8>,

    /// Path to log file.
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Maximum concurrent git processes (0 = unlimited).
    #[arg(short = 'j', long = "max-procs", value_name = "N")]
    pub max_procs: Option<usize>,

    /// Minimum milliseconds between successive process launches.
    #[arg(long = "launch-interval-ms", value_name = "MS")]
    pub launch_interval_ms: Option<u64>,

    /// Path to the git executable.
    #[arg(long = "git", value_name = "PATH")]
    pub git: Option<PathBuf>,

    /// Disables auto loading of `mgit.toml`, only uses --config.
    #[arg(long = "no-default-config")]
    pub no_default_config: bool,
}

impl GlobalOptions {
    /// Builds the configuration loader for these options: default file,
    /// explicit files, environment, then flag overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error when an override value cannot be converted.
    pub fn config_loader(&self) -> Result<ConfigLoader> {
        let mut loader = ConfigLoader::new();
        if !self.no_default_config {
            loader = loader.with_default_file();
        }
        for path in &self.configs {
            loader = loader.add_toml_file(path);
        }
        loader = loader.with_env();

        if let Some(level) = self.log_level {
            loader = loader.set("global.output_log_level", i64::from(level))?;
        }
        // file_log_level falls back to log_level if not specified
        if let Some(level) = self.file_log_level.or(self.log_level) {
            loader = loader.set("global.file_log_level", i64::from(level))?;
        }
        if let Some(path) = &self.log_file {
            loader = loader.set("global.log_file", path.display().to_string())?;
        }
        if self.dry {
            loader = loader.set("global.dry", true)?;
        }
        if let Some(max) = self.max_procs {
            loader = loader.set("batch.max_concurrent", i64::try_from(max).unwrap_or(i64::MAX))?;
        }
        if let Some(ms) = self.launch_interval_ms {
            loader = loader.set(
                "batch.launch_interval_ms",
                i64::try_from(ms).unwrap_or(i64::MAX),
            )?;
        }
        if let Some(git) = &self.git {
            loader = loader.set("git.executable", git.display().to_string())?;
        }
        Ok(loader)
    }
}
