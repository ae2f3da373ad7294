// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Nearest-ancestor inference for nested repository destinations.
//!
//! ```text
//! dev                       dev
//! dev/subdev1                +- subdev1            -> parent dev
//! dev/subdev1/s1             |   +- s1             -> parent subdev1
//! dev/subdev2                +- subdev2            -> parent dev
//! dev/subdev2/toto/s2        |   +- toto           (no group)
//! test                       |       +- s2         -> parent subdev2
//! test/extern/subtest1      test
//! doc/whats/up               +- extern             (no group)
//!                            |   +- subtest1       -> parent test
//!                           doc -> whats -> up     -> no parent
//! ```
//!
//! A node owns a group only when the accumulated path at that node is
//! exactly one of the input paths; intermediate segments own nothing
//! and are skipped when looking for the nearest owning ancestor. The
//! tree shape depends only on path content, so the resulting wiring is
//! independent of input order.

use std::collections::BTreeMap;
use std::path::Path;

use super::group::{Precondition, TaskGroup};

/// One path segment in the prefix tree. Children are arena indices.
#[derive(Debug)]
struct Node {
    segment: String,
    owner: Option<usize>,
    children: Vec<usize>,
}

/// Prefix tree over repository destination paths.
///
/// Built once per batch clone operation, queried for the nearest owning
/// ancestor of every path, then discarded.
#[derive(Debug)]
pub struct DependencyGraphBuilder {
    nodes: Vec<Node>,
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraphBuilder {
    /// Creates an empty tree (node 0 is the synthetic root).
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                segment: String::new(),
                owner: None,
                children: Vec::new(),
            }],
        }
    }

    /// Inserts one destination path owned by group `owner`.
    ///
    /// The delimiter is detected per path: `/` when present, `\`
    /// otherwise. Paths are not normalized globally because one batch
    /// may mix both conventions. When two groups claim the same path
    /// (duplicate destinations), the first claim wins; the caller
    /// orders the duplicates separately.
    pub fn insert(&mut self, path: &str, owner: usize) {
        let mut node = 0usize;
        for segment in split_segments(path) {
            node = self.child(node, segment);
        }
        if node != 0 && self.nodes[node].owner.is_none() {
            self.nodes[node].owner = Some(owner);
        }
    }

    /// Returns the index of `parent`'s child named `segment`, creating
    /// it if needed.
    fn child(&mut self, parent: usize, segment: &str) -> usize {
        if let Some(&idx) = self.nodes[parent]
            .children
            .iter()
            .find(|&&c| self.nodes[c].segment == segment)
        {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            segment: segment.to_string(),
            owner: None,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Walks the tree and reports, for every owning node, the owner of
    /// its nearest owning strict ancestor (or `None` for roots).
    #[must_use]
    pub fn parent_assignments(&self) -> Vec<(usize, Option<usize>)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, Option<usize>)> = vec![(0, None)];
        while let Some((node, ancestor)) = stack.pop() {
            let here = &self.nodes[node];
            let next_ancestor = match here.owner {
                Some(owner) => {
                    out.push((owner, ancestor));
                    Some(owner)
                }
                None => ancestor,
            };
            for &c in &here.children {
                stack.push((c, next_ancestor));
            }
        }
        out.sort_unstable();
        out
    }
}

/// Splits a path on its own delimiter, skipping empty segments.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let delimiter = if path.contains('/') { '/' } else { '\\' };
    path.split(delimiter).filter(|s| !s.is_empty())
}

/// Computes the ancestor map for a set of destination paths: each path
/// maps to its nearest strict ancestor path, or `None` for roots.
#[must_use]
pub fn ancestor_map<S: AsRef<str>>(paths: &[S]) -> BTreeMap<String, Option<String>> {
    let mut builder = DependencyGraphBuilder::new();
    for (idx, path) in paths.iter().enumerate() {
        builder.insert(path.as_ref(), idx);
    }
    builder
        .parent_assignments()
        .into_iter()
        .map(|(owner, parent)| {
            (
                paths[owner].as_ref().to_string(),
                parent.map(|p| paths[p].as_ref().to_string()),
            )
        })
        .collect()
}

/// Wires clone-ordering preconditions into `groups`.
///
/// `dests[i]` is the destination path of `groups[i]` relative to
/// `base`. Every group whose destination nests inside another group's
/// destination gets a "parent started and its directory exists"
/// precondition referencing the nearest such ancestor. Top-level groups
/// keep whatever precondition they already carry.
pub fn assign_clone_order<S: AsRef<str>>(groups: &mut [TaskGroup], dests: &[S], base: &Path) {
    debug_assert_eq!(groups.len(), dests.len());
    let mut builder = DependencyGraphBuilder::new();
    for (idx, dest) in dests.iter().enumerate() {
        builder.insert(dest.as_ref(), idx);
    }
    for (owner, parent) in builder.parent_assignments() {
        if let Some(parent) = parent {
            let dir = base.join(segments_as_path(dests[parent].as_ref()));
            groups[owner].set_precondition(Precondition::ParentStartedAndDirExists { parent, dir });
        }
    }
}

/// Rebuilds a relative path from its detected segments using the
/// platform separator, so mixed-delimiter input probes the right
/// directory.
fn segments_as_path(path: &str) -> std::path::PathBuf {
    split_segments(path).collect()
}
