// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!              MgError (boxed variants)
//!                     |
//!      +------+------+------+------+
//!      |      |      |      |      |
//!      v      v      v      v      v
//!    Bail  Proc   Cfg  Manifest  Batch  Io/Other
//!
//! Sub-errors (unboxed internally):
//!   Process  ExecutableNotFound, SpawnFailed, OutputError
//!   Config   ReadError, ParseError, InvalidValue, NotFound
//!   Manifest ReadError, ParseError, UnsupportedVersion, BadCommand
//!   Batch    TaskRestarted, TaskNotTerminal
//!
//! Failures of external git processes are NOT errors: they travel
//! through the batch engine as terminal task states. `Err` is reserved
//! for environment faults and programmer misuse.
//! ```

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`MgError`].
pub type MgResult<T> = std::result::Result<T, MgError>;

/// Top-level application error type.
///
/// All sub-errors are boxed to keep this enum small on the stack.
#[derive(Debug, Error)]
pub enum MgError {
    /// Fatal error that should terminate the application.
    #[error("fatal error: {0}")]
    Bailed(Box<str>),

    /// Process execution error.
    #[error("process error: {0}")]
    Process(#[from] Box<ProcessError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Multigit manifest error.
    #[error("manifest error: {0}")]
    Manifest(#[from] Box<ManifestError>),

    /// Batch engine usage error.
    #[error("batch error: {0}")]
    Batch(#[from] Box<BatchError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

/// Create a fatal [`MgError::Bailed`] that terminates the application.
pub fn bail_out(message: impl Into<String>) -> MgError {
    MgError::Bailed(message.into().into_boxed_str())
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for MgError {
                fn from(err: $error) -> Self {
                    MgError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    ProcessError => Process,
    ConfigError => Config,
    ManifestError => Manifest,
    BatchError => Batch,
    std::io::Error => Io,
}

// --- Process Errors ---

/// Process execution errors.
///
/// These cover only environment faults around *launching* processes.
/// A process that starts and exits non-zero is reported through
/// [`crate::core::process::ProcessOutcome`], never through this enum.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read process output.
    #[error("failed to read output from process '{command}': {message}")]
    OutputError { command: String, message: String },
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },

    /// Configuration file not found.
    #[error("config file not found: {0}")]
    NotFound(String),
}

// --- Manifest Errors ---

/// Multigit manifest errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read the manifest file.
    #[error("failed to read multigit file '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the manifest content.
    #[error("failed to parse multigit file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// The manifest declares a file format version this build cannot read.
    #[error("unsupported multigit file format version: {found}")]
    UnsupportedVersion { found: String },

    /// A post-clone command string could not be split into an argv.
    #[error("malformed post-clone command: {command}")]
    BadCommand { command: String },
}

// --- Batch Errors ---

/// Batch engine usage errors.
///
/// These indicate programmer misuse of the engine API, not failures of
/// the work being executed.
#[derive(Debug, Error)]
pub enum BatchError {
    /// `run` was invoked on a task that already started.
    #[error("task '{description}' was started twice")]
    TaskRestarted { description: String },

    /// A retry was requested for a task that is not in a terminal state.
    #[error("task '{description}' cannot be retried: not finished")]
    TaskNotTerminal { description: String },
}
