// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use super::{Command, try_parse_from};

#[test]
fn test_version_command() {
    let cli = try_parse_from(["mgit", "version"]).unwrap();
    assert!(matches!(cli.command, Some(Command::Version)));
}

#[test]
fn test_no_command_parses() {
    let cli = try_parse_from(["mgit"]).unwrap();
    assert!(cli.command.is_none());
}

#[test]
fn test_clone_command_with_defaults() {
    let cli = try_parse_from(["mgit", "clone", "product.mgit"]).unwrap();
    let Some(Command::Clone(args)) = cli.command else {
        panic!("expected clone command");
    };
    assert_eq!(args.file, PathBuf::from("product.mgit"));
    assert_eq!(args.dest, PathBuf::from("."));
    assert!(!args.keep_going);
    assert!(!args.no_post_clone);
}

#[test]
fn test_clone_command_with_options() {
    let cli = try_parse_from([
        "mgit",
        "clone",
        "--dest",
        "/work",
        "--keep-going",
        "--no-post-clone",
        "product.mgit",
    ])
    .unwrap();
    let Some(Command::Clone(args)) = cli.command else {
        panic!("expected clone command");
    };
    assert_eq!(args.dest, PathBuf::from("/work"));
    assert!(args.keep_going);
    assert!(args.no_post_clone);
}

#[test]
fn test_exec_command_trailing_args() {
    let cli = try_parse_from(["mgit", "exec", "--root", "/work", "--", "fetch", "--all"]).unwrap();
    let Some(Command::Exec(args)) = cli.command else {
        panic!("expected exec command");
    };
    assert_eq!(args.root, PathBuf::from("/work"));
    assert_eq!(args.args, vec!["fetch".to_string(), "--all".to_string()]);
}

#[test]
fn test_exec_requires_git_args() {
    assert!(try_parse_from(["mgit", "exec"]).is_err());
}

#[test]
fn test_global_options() {
    let cli = try_parse_from([
        "mgit",
        "-l",
        "4",
        "-j",
        "3",
        "--git",
        "/opt/git/bin/git",
        "--dry",
        "-c",
        "extra.toml",
        "options",
    ])
    .unwrap();
    assert_eq!(cli.global.log_level, Some(4));
    assert_eq!(cli.global.max_procs, Some(3));
    assert_eq!(cli.global.git, Some(PathBuf::from("/opt/git/bin/git")));
    assert!(cli.global.dry);
    assert_eq!(cli.global.configs, vec![PathBuf::from("extra.toml")]);
    assert!(matches!(cli.command, Some(Command::Options)));
}

#[test]
fn test_log_level_out_of_range_rejected() {
    assert!(try_parse_from(["mgit", "--log-level", "6", "options"]).is_err());
}
