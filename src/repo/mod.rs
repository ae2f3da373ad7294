// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository identity and filesystem discovery.
//!
//! ```text
//! RepoRef { name, path }        stable identity handed to the engine
//! discover_repos(root, opts)    parallel walk for `.git` directories
//! ```
//!
//! The engine never interprets repository contents. Discovery only
//! locates working copies (directories containing `.git`) so that batch
//! commands can be fanned out across them; nested working copies are
//! found too.

use bon::Builder;
use ignore::WalkBuilder;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Stable identity of one repository: display name plus working-copy
/// path on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    name: String,
    path: PathBuf,
}

impl RepoRef {
    /// Creates a repository reference.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Creates a reference named after the path's final component.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { name, path }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the working-copy path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Options for repository discovery.
#[derive(Debug, Clone, Builder)]
pub struct DiscoverOptions {
    /// Maximum directory depth to search (None = unlimited).
    #[builder(setters(name = with_max_depth))]
    max_depth: Option<usize>,
    /// Follow symbolic links.
    #[builder(setters(name = with_follow_links), default = false)]
    follow_links: bool,
    /// Number of walker threads (None = auto-detect).
    #[builder(setters(name = with_threads))]
    threads: Option<usize>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DiscoverOptions {
    /// Returns the maximum search depth.
    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns whether symbolic links are followed.
    #[must_use]
    pub const fn follow_links(&self) -> bool {
        self.follow_links
    }

    /// Returns the walker thread count.
    #[must_use]
    pub const fn threads(&self) -> Option<usize> {
        self.threads
    }
}

/// Finds all git working copies under `root`, including nested ones.
///
/// A directory counts as a working copy when it contains a `.git`
/// entry. The walk never descends *into* `.git` directories. Results
/// are sorted by path so discovery is deterministic regardless of
/// walker scheduling.
///
/// # Errors
///
/// Returns an error if `root` does not exist or is not a directory.
pub fn discover_repos(root: &Path, options: &DiscoverOptions) -> Result<Vec<RepoRef>> {
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }

    let threads = options
        .threads()
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        })
        .max(1);

    let (tx, rx) = flume::bounded::<PathBuf>(1024);

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(options.follow_links())
        .max_depth(options.max_depth())
        .threads(threads)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            use ignore::WalkState;
            let Ok(entry) = entry else {
                return WalkState::Continue;
            };
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir && entry.path().join(".git").exists() {
                let _ = tx.send(entry.path().to_path_buf());
            }
            WalkState::Continue
        })
    });
    drop(tx);

    let mut paths: Vec<PathBuf> = rx.into_iter().collect();
    paths.sort();

    Ok(paths.into_iter().map(RepoRef::from_path).collect())
}
