// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    ABORTED_EXIT, CrashDetector, LAUNCH_FAILED_EXIT, ProcessFlags, ProcessRunner,
    SILENT_CRASH_EXIT,
};

fn sh(script: &str) -> ProcessRunner {
    ProcessRunner::new("/bin/sh").args(["-c", script])
}

#[tokio::test]
async fn test_run_captures_output() {
    let outcome = sh("echo hello; echo world").run(CancellationToken::new()).await;
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.success());
    assert!(!outcome.is_interrupted());
    assert_eq!(outcome.output(), "hello\nworld");
}

#[tokio::test]
async fn test_run_merges_stderr() {
    let outcome = sh("echo out; echo err 1>&2").run(CancellationToken::new()).await;
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.output().contains("out"));
    assert!(outcome.output().contains("err"));
}

#[tokio::test]
async fn test_nonzero_exit_is_data_not_error() {
    let outcome = sh("exit 3")
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run(CancellationToken::new())
        .await;
    assert_eq!(outcome.exit_code(), 3);
    assert!(!outcome.success());
}

#[tokio::test]
async fn test_launch_failure_sentinel() {
    let outcome = ProcessRunner::new("/nonexistent/definitely-not-a-binary")
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run(CancellationToken::new())
        .await;
    assert_eq!(outcome.exit_code(), LAUNCH_FAILED_EXIT);
    assert!(outcome.output().contains("failed to start"));
}

#[tokio::test]
async fn test_silent_crash_sentinel() {
    let outcome = sh("echo 'Stack trace:'; exit 0")
        .detector(CrashDetector::default())
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run(CancellationToken::new())
        .await;
    assert_eq!(outcome.exit_code(), SILENT_CRASH_EXIT);
}

#[tokio::test]
async fn test_crash_detector_ignores_failing_exit() {
    // Markers only rewrite untrustworthy zero exits.
    let outcome = sh("echo 'Stack trace:'; exit 7")
        .detector(CrashDetector::default())
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run(CancellationToken::new())
        .await;
    assert_eq!(outcome.exit_code(), 7);
}

#[tokio::test]
async fn test_abort_kills_process() {
    let token = CancellationToken::new();
    let aborter = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        aborter.cancel();
    });

    let start = std::time::Instant::now();
    let outcome = sh("sleep 10").run(token).await;
    assert!(start.elapsed() < std::time::Duration::from_secs(5));
    assert!(outcome.is_interrupted());
    assert_eq!(outcome.exit_code(), ABORTED_EXIT);
}

#[tokio::test]
async fn test_abort_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let outcome = sh("echo never").run(token).await;
    assert!(outcome.is_interrupted());
    assert_eq!(outcome.exit_code(), ABORTED_EXIT);
    assert!(outcome.output().is_empty());
}

#[tokio::test]
async fn test_streamed_lines_arrive_before_outcome() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = sh("echo one; echo two")
        .stream_lines(tx)
        .run(CancellationToken::new())
        .await;
    assert!(outcome.success());

    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn test_run_blocking() {
    let outcome = sh("echo sync; exit 5")
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run_blocking();
    assert_eq!(outcome.exit_code(), 5);
    assert!(outcome.output().contains("sync"));
}

#[test]
fn test_run_blocking_launch_failure() {
    let outcome = ProcessRunner::new("/nonexistent/definitely-not-a-binary")
        .flag(ProcessFlags::ALLOW_ERRORS)
        .run_blocking();
    assert_eq!(outcome.exit_code(), LAUNCH_FAILED_EXIT);
}

#[test]
fn test_which_resolves_and_fails() {
    assert!(ProcessRunner::which("sh").is_ok());
    assert!(ProcessRunner::which("definitely-not-a-binary-mgit").is_err());
}

#[test]
fn test_crash_detector_disabled_never_matches() {
    let detector = CrashDetector::disabled();
    assert!(!detector.matches("Stack trace: boom"));
    assert!(CrashDetector::default().matches("prefix Stack trace: boom"));
}
