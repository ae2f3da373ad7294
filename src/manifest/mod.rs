// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The multigit file: a JSON descriptor of a group of repositories.
//!
//! ```text
//! {
//!   "fileFormatVersion": "1.0",
//!   "description": "my product",
//!   "variables": { "BASE": "https://git.example.com" },
//!   "repositories": [
//!     { "url": "$BASE$/dev.git", "head": "main",
//!       "head_type": "branch", "destination": "dev" }
//!   ],
//!   "postCloneCommands": [ "submodule update --init" ]
//! }
//! ```
//!
//! `$NAME$` tokens are substituted from `variables` into every string
//! field; values may themselves contain tokens, resolved over a bounded
//! number of passes. The batch engine never sees this format, only the
//! resolved descriptors.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ManifestError;

/// Substitution passes before giving up on nested `$NAME$` tokens.
const MAX_SUBSTITUTION_PASSES: usize = 8;

/// How the `head` ref of a repository should be checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadType {
    /// A branch, checked out tracking its remote.
    #[default]
    Branch,
    /// A tag, checked out detached.
    Tag,
    /// A commit hash, checked out detached.
    Commit,
}

/// One repository entry, before variable substitution.
#[derive(Debug, Clone, Deserialize)]
struct RawRepository {
    url: String,
    head: String,
    #[serde(default)]
    head_type: HeadType,
    destination: String,
    #[serde(default)]
    description: Option<String>,
}

/// The multigit file as deserialized, tokens unresolved.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    /// Historically written as `"1.0"`, `1.0` or `1`; all accepted.
    file_format_version: serde_json::Value,
    #[serde(default)]
    description: String,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    repositories: Vec<RawRepository>,
    #[serde(default)]
    post_clone_commands: Vec<String>,
}

/// A fully resolved repository descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Clone URL.
    pub url: String,
    /// Ref to check out after cloning.
    pub head: String,
    /// What kind of ref `head` is.
    pub head_type: HeadType,
    /// Destination path, relative to the clone root.
    pub destination: String,
    /// Optional display description.
    pub description: Option<String>,
}

/// A parsed and resolved multigit file.
#[derive(Debug, Clone)]
pub struct MultigitFile {
    description: String,
    repos: Vec<RepoSpec>,
    post_clone_commands: Vec<Vec<String>>,
}

impl MultigitFile {
    /// Reads and resolves a multigit file from disk.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, malformed JSON, unsupported format
    /// versions, unsplittable post-clone commands.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::ReadError {
            path: origin.clone(),
            source,
        })?;
        Self::parse(&text, &origin)
    }

    /// Parses and resolves multigit JSON. `origin` names the source in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Same conditions as [`MultigitFile::load`], minus I/O.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ManifestError> {
        let raw: RawFile =
            serde_json::from_str(text).map_err(|e| ManifestError::ParseError {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        if !version_supported(&raw.file_format_version) {
            return Err(ManifestError::UnsupportedVersion {
                found: raw.file_format_version.to_string(),
            });
        }

        let vars = &raw.variables;
        let repos = raw
            .repositories
            .into_iter()
            .map(|r| RepoSpec {
                url: substitute(&r.url, vars),
                head: substitute(&r.head, vars),
                head_type: r.head_type,
                destination: substitute(&r.destination, vars),
                description: r.description.map(|d| substitute(&d, vars)),
            })
            .collect();

        let post_clone_commands = raw
            .post_clone_commands
            .iter()
            .map(|command| {
                let resolved = substitute(command, vars);
                shlex::split(&resolved)
                    .filter(|argv| !argv.is_empty())
                    .ok_or_else(|| ManifestError::BadCommand {
                        command: command.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            description: substitute(&raw.description, vars),
            repos,
            post_clone_commands,
        })
    }

    /// Returns the file's description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the resolved repository descriptors, in file order.
    #[must_use]
    pub fn repos(&self) -> &[RepoSpec] {
        &self.repos
    }

    /// Returns the post-clone commands as git argument vectors, run
    /// inside each fresh clone.
    #[must_use]
    pub fn post_clone_commands(&self) -> &[Vec<String>] {
        &self.post_clone_commands
    }

    /// Returns the destinations claimed by more than one repository.
    /// The clone flow routes every duplicate after the first through a
    /// temporary directory.
    #[must_use]
    pub fn duplicate_destinations(&self) -> Vec<String> {
        let mut seen = BTreeMap::<&str, usize>::new();
        for repo in &self.repos {
            *seen.entry(repo.destination.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(dest, _)| dest.to_string())
            .collect()
    }
}

/// Accepts `"1"`, `"1.0"`, `1` and `1.0`; anything else is a format
/// this build does not understand.
fn version_supported(version: &serde_json::Value) -> bool {
    let major = match version {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    major.is_some_and(|v| v >= 1.0 && v < 2.0)
}

/// Replaces `$NAME$` tokens from the variable map, repeatedly, so
/// variables may reference each other. Unknown tokens are left alone.
fn substitute(input: &str, vars: &BTreeMap<String, String>) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_SUBSTITUTION_PASSES {
        let mut next = current.clone();
        for (name, value) in vars {
            next = next.replace(&format!("${name}$"), value);
        }
        if next == current {
            break;
        }
        current = next;
    }
    current
}
