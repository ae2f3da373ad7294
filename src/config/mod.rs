// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for mgit-rs.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. mgit.toml (cwd)
//! 3. --config
//! 4. MGIT_* env vars
//! 5. CLI overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! MGIT_GLOBAL_DRY=true        → global.dry = true
//! MGIT_BATCH_MAX_CONCURRENT=4 → batch.max_concurrent = 4
//! MGIT_GIT_EXECUTABLE=/bin/g  → git.executable = "/bin/g"
//! ```

pub mod loader;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{LaunchPolicy, SessionConfig};
use crate::core::process::CrashDetector;
use crate::error::{ConfigError, Result};
use crate::logging::{LogConfig, LogLevel};

use loader::ConfigLoader;

/// Global options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Print what would run without launching anything.
    pub dry: bool,
    /// Console log level (0-5).
    pub output_log_level: LogLevel,
    /// File log level (0-5).
    pub file_log_level: LogLevel,
    /// Log file path; unset disables the file layer.
    pub log_file: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            dry: false,
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::TRACE,
            log_file: None,
        }
    }
}

/// Batch scheduler options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Maximum concurrently running groups (0 = unlimited).
    pub max_concurrent: usize,
    /// Minimum milliseconds between successive process launches.
    pub launch_interval_ms: u64,
    /// Milliseconds between re-polls when groups are blocked purely by
    /// preconditions.
    pub rescan_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            launch_interval_ms: 200,
            rescan_interval_ms: 1000,
        }
    }
}

/// Git process options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Git executable, absolute or PATH-relative.
    pub executable: String,
    /// Output markers that mark a zero-exit process as crashed.
    pub crash_markers: Vec<String>,
    /// Authentication failures tolerated before new network commands
    /// stop launching (0 = unlimited).
    pub max_auth_failures: u32,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            crash_markers: CrashDetector::default().markers().to_vec(),
            max_auth_failures: 3,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Batch scheduler options.
    pub batch: BatchConfig,
    /// Git process options.
    pub git: GitConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mgit_rs::config::Config;
    ///
    /// let config = Config::builder()
    ///     .with_default_file()
    ///     .with_env()
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file (simple API).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid
    /// TOML, or does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not
    /// match the `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error when the git executable is configured empty.
    pub fn validate(&self) -> Result<()> {
        if self.git.executable.trim().is_empty() {
            return Err(crate::error::MgError::from(ConfigError::InvalidValue {
                section: "git".to_string(),
                key: "executable".to_string(),
                message: "must not be empty".to_string(),
            })
            .into());
        }
        Ok(())
    }

    /// Builds the scheduler configuration for one session.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .with_max_concurrent(self.batch.max_concurrent)
            .with_launch_interval(Duration::from_millis(self.batch.launch_interval_ms))
            .with_rescan_interval(Duration::from_millis(self.batch.rescan_interval_ms))
            .build()
    }

    /// Builds the logging configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let builder = LogConfig::builder()
            .with_console_level(self.global.output_log_level)
            .with_file_level(self.global.file_log_level);
        match &self.global.log_file {
            Some(path) => builder
                .with_log_file(path.display().to_string())
                .build(),
            None => builder.build(),
        }
    }

    /// Builds the crash-signature detector from the configured markers.
    #[must_use]
    pub fn crash_detector(&self) -> CrashDetector {
        CrashDetector::new(self.git.crash_markers.clone())
    }

    /// Builds a fresh authentication-failure policy.
    #[must_use]
    pub const fn launch_policy(&self) -> LaunchPolicy {
        LaunchPolicy::new(self.git.max_auth_failures)
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        options.insert("global.dry".to_string(), self.global.dry.to_string());
        options.insert(
            "global.output_log_level".to_string(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".to_string(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.log_file".to_string(),
            self.global
                .log_file
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        );
        options.insert(
            "batch.max_concurrent".to_string(),
            self.batch.max_concurrent.to_string(),
        );
        options.insert(
            "batch.launch_interval_ms".to_string(),
            self.batch.launch_interval_ms.to_string(),
        );
        options.insert(
            "batch.rescan_interval_ms".to_string(),
            self.batch.rescan_interval_ms.to_string(),
        );
        options.insert("git.executable".to_string(), self.git.executable.clone());
        options.insert(
            "git.crash_markers".to_string(),
            self.git.crash_markers.join(", "),
        );
        options.insert(
            "git.max_auth_failures".to_string(),
            self.git.max_auth_failures.to_string(),
        );

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);
        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }
}
