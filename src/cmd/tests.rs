// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use crate::batch::{Precondition, Task, TaskKind};
use crate::manifest::MultigitFile;
use crate::repo::RepoRef;

use super::clone::build_clone_groups;
use super::exec::build_exec_groups;

fn manifest(text: &str) -> MultigitFile {
    MultigitFile::parse(text, "test").unwrap()
}

#[test]
fn test_clone_groups_follow_file_order_and_nesting() {
    let file = manifest(
        r#"{
        "fileFormatVersion": "1.0",
        "repositories": [
            { "url": "u1", "head": "main", "destination": "dev" },
            { "url": "u2", "head": "main", "destination": "dev/subdev1" },
            { "url": "u3", "head": "main", "destination": "doc/whats/up" }
        ]
    }"#,
    );
    let base = Path::new("/work");
    let groups = build_clone_groups(&file, base, true);

    assert_eq!(groups.len(), 3);
    assert_eq!(*groups[0].precondition(), Precondition::None);
    assert_eq!(
        *groups[1].precondition(),
        Precondition::ParentStartedAndDirExists {
            parent: 0,
            dir: base.join("dev"),
        }
    );
    assert_eq!(*groups[2].precondition(), Precondition::None);
    assert_eq!(groups[1].repo().path(), base.join("dev/subdev1"));
}

#[test]
fn test_branch_head_uses_clone_branch_flag() {
    let file = manifest(
        r#"{
        "fileFormatVersion": "1.0",
        "repositories": [
            { "url": "u", "head": "release-2.4", "destination": "d" }
        ]
    }"#,
    );
    let groups = build_clone_groups(&file, Path::new("/work"), true);
    let tasks = groups[0].tasks();

    // Comment marker, then the clone itself; no checkout task for a branch.
    assert_eq!(tasks.len(), 2);
    let TaskKind::Git { args, inside_repo } = tasks[1].kind() else {
        panic!("expected a git clone task");
    };
    assert!(!inside_repo);
    assert_eq!(args[0], "clone");
    assert!(args.contains(&"--branch".to_string()));
    assert!(args.contains(&"release-2.4".to_string()));
}

#[test]
fn test_tag_head_gets_detached_checkout_inside_repo() {
    let file = manifest(
        r#"{
        "fileFormatVersion": "1.0",
        "repositories": [
            { "url": "u", "head": "v1.0", "head_type": "tag", "destination": "d" }
        ]
    }"#,
    );
    let groups = build_clone_groups(&file, Path::new("/work"), true);
    let tasks = groups[0].tasks();
    assert_eq!(tasks.len(), 3);

    let TaskKind::Git { args, .. } = tasks[1].kind() else {
        panic!("expected a git clone task");
    };
    assert!(!args.contains(&"--branch".to_string()));

    let TaskKind::Git { args, inside_repo } = tasks[2].kind() else {
        panic!("expected a checkout task");
    };
    assert!(inside_repo);
    assert_eq!(args, &["checkout".to_string(), "v1.0".to_string(), "--".to_string()]);
}

#[test]
fn test_post_clone_commands_append_per_repo() {
    let text = r#"{
        "fileFormatVersion": "1.0",
        "repositories": [
            { "url": "u", "head": "main", "destination": "d" }
        ],
        "postCloneCommands": ["submodule update --init"]
    }"#;
    let with = build_clone_groups(&manifest(text), Path::new("/w"), true);
    let without = build_clone_groups(&manifest(text), Path::new("/w"), false);
    assert_eq!(with[0].tasks().len(), 3);
    assert_eq!(without[0].tasks().len(), 2);

    let TaskKind::Git { args, inside_repo } = with[0].tasks()[2].kind() else {
        panic!("expected a post-clone task");
    };
    assert!(inside_repo);
    assert_eq!(args[0], "submodule");
}

#[test]
fn test_duplicate_destination_routes_through_staging() {
    let file = manifest(
        r#"{
        "fileFormatVersion": "1.0",
        "repositories": [
            { "url": "first", "head": "main", "destination": "same" },
            { "url": "second", "head": "main", "destination": "same" },
            { "url": "third", "head": "main", "destination": "same" }
        ]
    }"#,
    );
    let base = Path::new("/work");
    let groups = build_clone_groups(&file, base, false);

    assert_eq!(*groups[0].precondition(), Precondition::None);
    assert_eq!(
        *groups[1].precondition(),
        Precondition::ParentFinished { parent: 0 }
    );

    let kinds: Vec<_> = groups[1].tasks().iter().map(Task::kind).collect();
    assert!(matches!(kinds[1], TaskKind::Git { .. }));
    assert!(matches!(kinds[2], TaskKind::MoveDir { .. }));
    assert!(matches!(kinds[3], TaskKind::DeleteDir { .. }));

    // The duplicate stages its clone, then surfaces at a numbered
    // sibling of the taken destination.
    let TaskKind::MoveDir { from, to } = kinds[2] else {
        unreachable!();
    };
    assert_eq!(*from, base.join(".mgit-staging-1").join("same-2"));
    assert_eq!(*to, base.join("same-2"));
    assert_eq!(groups[1].repo().path(), base.join("same-2"));

    let TaskKind::MoveDir { to, .. } = groups[2].tasks()[2].kind() else {
        panic!("expected a move task");
    };
    assert_eq!(*to, base.join("same-3"));
}

#[test]
fn test_exec_groups_scope_to_each_repo() {
    let repos = vec![
        RepoRef::new("a", "/work/a"),
        RepoRef::new("b", "/work/b"),
    ];
    let args = vec!["fetch".to_string(), "--all".to_string()];
    let groups = build_exec_groups(&repos, &args);

    assert_eq!(groups.len(), 2);
    for (group, repo) in groups.iter().zip(&repos) {
        assert_eq!(group.repo(), repo);
        assert_eq!(*group.precondition(), Precondition::None);
        let TaskKind::Git { args: got, inside_repo } = group.tasks()[0].kind() else {
            panic!("expected a git task");
        };
        assert!(inside_repo);
        assert_eq!(got, &args);
    }
}
