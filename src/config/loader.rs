// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration loading from multiple sources.
//!
//! # Loader Pipeline
//!
//! ```text
//! ConfigLoader::new()
//!   .with_default_file()   mgit.toml from the working directory
//!   .add_toml_file(f)      --config FILE, in order
//!   .with_env()            MGIT_* variables
//!   .set(key, value)       CLI flag overrides
//!        |
//!        v
//!    build() --> Config
//! ```
//!
//! Each layer overrides the previous one; the loader also records
//! where every file layer came from so `mgit configs` can list them.

use std::path::{Path, PathBuf};

use super::Config;
use crate::error::{ConfigError, MgError, Result};

/// Configuration file picked up from the working directory unless
/// `--no-default-config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "mgit.toml";

/// Prefix for environment overrides, e.g. `MGIT_GLOBAL_DRY=true`.
pub const ENV_PREFIX: &str = "MGIT";

/// Where a configuration layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The implicit `mgit.toml` in the working directory.
    Default,
    /// A file passed with `--config`.
    File,
    /// Inline TOML from tests or embedders.
    Inline,
}

impl SourceKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::File => "file",
            Self::Inline => "inline",
        }
    }
}

/// Builder layering the default file, explicit files, environment
/// variables, and flag overrides into a [`Config`].
pub struct ConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: bool,
    sources: Vec<(SourceKind, PathBuf)>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
            env: false,
            sources: Vec::new(),
        }
    }

    /// Adds the optional [`DEFAULT_CONFIG_FILE`] from the working
    /// directory as the lowest file layer.
    #[must_use]
    pub fn with_default_file(self) -> Self {
        self.push_file(SourceKind::Default, Path::new(DEFAULT_CONFIG_FILE), false)
    }

    /// Adds a required TOML file. `build()` fails when the file is
    /// missing or not valid TOML.
    #[must_use]
    pub fn add_toml_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.push_file(SourceKind::File, path.as_ref(), true)
    }

    /// Adds a TOML file that is silently skipped when absent.
    #[must_use]
    pub fn add_toml_file_optional<P: AsRef<Path>>(self, path: P) -> Self {
        self.push_file(SourceKind::File, path.as_ref(), false)
    }

    /// Adds inline TOML content.
    #[must_use]
    pub fn add_toml_str(mut self, content: &str) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from_str(content, FileFormat::Toml));
        self.sources
            .push((SourceKind::Inline, PathBuf::from("<inline>")));
        self
    }

    /// Layers `MGIT_*` environment variables over every file source.
    #[must_use]
    pub const fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    /// Sets a single override on top of everything else, e.g.
    /// `set("batch.max_concurrent", 4)` for `-j 4`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is invalid or the value cannot be
    /// converted to a configuration value.
    pub fn set<T: Into<config::Value>>(mut self, key: &str, value: T) -> Result<Self> {
        self.builder = self.builder.set_override(key, value).map_err(|e| {
            let (section, key) = key.split_once('.').unwrap_or(("", key));
            MgError::from(ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(self)
    }

    /// Builds the configuration from all added sources.
    ///
    /// # Errors
    ///
    /// Returns an error when a required file is missing, a source is
    /// not valid TOML, the merged result does not deserialize into
    /// [`Config`], or validation rejects it.
    pub fn build(self) -> Result<Config> {
        let mut builder = self.builder;
        if self.env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("_")
                    .try_parsing(true),
            );
        }
        let merged = builder.build()?;
        let config: Config = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the recorded sources in layering order. Optional files
    /// that were absent at load time are not listed.
    #[must_use]
    pub fn sources(&self) -> &[(SourceKind, PathBuf)] {
        &self.sources
    }

    /// Formats the sources for `mgit configs`, one line per layer.
    #[must_use]
    pub fn format_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, (kind, path))| format!("{}. [{}] {}", i + 1, kind.label(), path.display()))
            .collect()
    }

    fn push_file(mut self, kind: SourceKind, path: &Path, required: bool) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from(path).format(FileFormat::Toml).required(required));
        if required || path.exists() {
            self.sources.push((kind, path.to_path_buf()));
        }
        self
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
