// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::batch::decision::{
    ChannelDecisions, ContinueOnError, FailureDecision, ScriptedDecisions,
};
use crate::batch::group::{Precondition, TaskGroup};
use crate::batch::report::BatchEvent;
use crate::batch::task::Task;
use crate::repo::RepoRef;

use super::{BatchSession, LaunchPolicy, SessionConfig};

/// A task running `script` through `/bin/sh -c`; the session is
/// pointed at `/bin/sh` instead of git, which the engine never notices.
fn sh_task(description: &str, script: &str) -> Task {
    Task::git(description, ["-c", script], false)
}

fn sh_group(name: &str, scripts: &[&str]) -> TaskGroup {
    let tasks = scripts
        .iter()
        .enumerate()
        .map(|(i, s)| sh_task(&format!("{name} step {i}"), s))
        .collect();
    TaskGroup::new(format!("batch {name}"), RepoRef::new(name, "/tmp"), tasks)
}

fn fast_config(cap: usize) -> SessionConfig {
    SessionConfig::builder()
        .with_max_concurrent(cap)
        .with_launch_interval(Duration::from_millis(10))
        .with_rescan_interval(Duration::from_millis(50))
        .build()
}

fn session(groups: Vec<TaskGroup>, cap: usize) -> BatchSession {
    BatchSession::new(groups, fast_config(cap)).git_executable("/bin/sh")
}

/// Collects session events with receipt timestamps until the session
/// drops its sender.
fn collect_events(
    rx: mpsc::UnboundedReceiver<BatchEvent>,
) -> JoinHandle<Vec<(Instant, BatchEvent)>> {
    tokio::spawn(async move {
        let mut rx = rx;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push((Instant::now(), event));
        }
        events
    })
}

/// Replays group start/finish events and returns the highest number of
/// simultaneously in-flight groups.
fn max_in_flight(events: &[(Instant, BatchEvent)]) -> usize {
    let mut current = 0usize;
    let mut max = 0usize;
    for (_, event) in events {
        match event {
            BatchEvent::GroupStarted { .. } => {
                current += 1;
                max = max.max(current);
            }
            BatchEvent::GroupFinished { .. } => current = current.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn position(events: &[(Instant, BatchEvent)], pred: impl Fn(&BatchEvent) -> bool) -> Option<usize> {
    events.iter().position(|(_, e)| pred(e))
}

#[tokio::test]
async fn test_empty_batch_completes_immediately() {
    let outcome = session(Vec::new(), 0).run().await.unwrap();
    assert!(outcome.success());
    assert_eq!(outcome.counters.percent(), 100);
    assert_eq!(outcome.counters.done(), 0);
    assert!(outcome.repos.is_empty());
}

#[tokio::test]
async fn test_group_with_no_tasks_counts_as_done() {
    let groups = vec![
        TaskGroup::new("batch empty", RepoRef::new("empty", "/tmp"), Vec::new()),
        sh_group("real", &["true"]),
    ];
    let outcome = session(groups, 0).run().await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.counters.done(), outcome.counters.total());
    assert_eq!(outcome.counters.done(), 2);
    assert!(outcome.repos[0].success);
    assert!(outcome.log.render().contains("empty: ok (no tasks)"));
}

#[tokio::test]
async fn test_missing_git_executable_fails_fast() {
    let groups = vec![sh_group("a", &["true"])];
    let result = session(groups, 0).git_executable("").run().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_tasks_within_a_group_run_strictly_in_sequence() {
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![sh_group("solo", &["echo a", "echo b", "echo c"])];
    let outcome = session(groups, 0).events(tx).run().await.unwrap();
    assert!(outcome.success());

    let events = collector.await.unwrap();
    let order: Vec<(usize, bool)> = events
        .iter()
        .filter_map(|(_, e)| match e {
            BatchEvent::TaskStarted { task, .. } => Some((*task, true)),
            BatchEvent::TaskFinished { task, .. } => Some((*task, false)),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec![(0, true), (0, false), (1, true), (1, false), (2, true), (2, false)]
    );
}

#[tokio::test]
async fn test_concurrency_cap_three_groups_two_slots() {
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![
        sh_group("a", &["sleep 0.3"]),
        sh_group("b", &["sleep 0.3"]),
        sh_group("c", &["sleep 0.3"]),
    ];
    let outcome = session(groups, 2).events(tx).run().await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.counters.errors(), 0);
    assert_eq!(outcome.counters.done(), 3);

    let events = collector.await.unwrap();
    assert_eq!(max_in_flight(&events), 2);
}

#[tokio::test]
async fn test_nested_clone_starts_once_parent_directory_appears() {
    let tmp = tempfile::tempdir().unwrap();
    let parent_dir = tmp.path().join("parent");
    let mkdir = format!("sleep 0.25 && mkdir {}", parent_dir.display());

    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let mut groups = vec![
        sh_group("parent", &[&mkdir, "sleep 0.25"]),
        sh_group("child", &["true"]),
    ];
    groups[1].set_precondition(Precondition::ParentStartedAndDirExists {
        parent: 0,
        dir: parent_dir,
    });

    let outcome = session(groups, 0).events(tx).run().await.unwrap();
    assert!(outcome.success());

    let events = collector.await.unwrap();
    let parent_start = position(&events, |e| {
        matches!(e, BatchEvent::GroupStarted { group: 0, .. })
    })
    .unwrap();
    let child_start = position(&events, |e| {
        matches!(e, BatchEvent::GroupStarted { group: 1, .. })
    })
    .unwrap();
    let parent_finish = position(&events, |e| {
        matches!(e, BatchEvent::GroupFinished { group: 0, .. })
    })
    .unwrap();

    // The child only starts after the parent's directory exists, but
    // does not wait for the parent's remaining steps.
    assert!(child_start > parent_start);
    assert!(child_start < parent_finish);
    let held_back = events[child_start].0 - events[parent_start].0;
    assert!(held_back >= Duration::from_millis(200), "held back {held_back:?}");
}

#[tokio::test]
async fn test_dead_end_precondition_aborts_dependent_without_running_it() {
    let tmp = tempfile::tempdir().unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    // The parent fails before ever creating its directory; the default
    // abort-on-error policy finalizes it, making the child unrunnable.
    let mut groups = vec![sh_group("parent", &["exit 1"]), sh_group("child", &["true"])];
    groups[1].set_precondition(Precondition::ParentStartedAndDirExists {
        parent: 0,
        dir: tmp.path().join("never-created"),
    });

    let outcome = session(groups, 0).events(tx).run().await.unwrap();
    assert!(!outcome.success());
    assert_eq!(outcome.counters.done(), 2);
    assert!(outcome.repos[1].aborted);

    let events = collector.await.unwrap();
    assert!(position(&events, |e| matches!(e, BatchEvent::GroupStarted { group: 1, .. })).is_none());
}

#[tokio::test]
async fn test_retry_then_continue_decision_flow() {
    let (provider, mut decision_rx) = ChannelDecisions::new();
    tokio::spawn(async move {
        let mut script = [FailureDecision::Retry, FailureDecision::Continue].into_iter();
        while let Some((report, reply)) = decision_rx.recv().await {
            assert_eq!(report.task_index, 1);
            assert_eq!(report.task_count, 3);
            let _ = reply.send(script.next().unwrap_or(FailureDecision::Abort));
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![sh_group("r", &["true", "exit 3", "true"])];
    let outcome = session(groups, 0)
        .decisions(Arc::new(provider))
        .events(tx)
        .run()
        .await
        .unwrap();

    // Retry uncounted the first failure; Continue kept the second.
    assert!(!outcome.aborted);
    assert!(!outcome.repos[0].aborted);
    assert_eq!(outcome.counters.errors(), 1);

    let events = collector.await.unwrap();
    let starts_of_task_1 = events
        .iter()
        .filter(|(_, e)| matches!(e, BatchEvent::TaskStarted { task: 1, .. }))
        .count();
    assert_eq!(starts_of_task_1, 2);

    let awaiting = position(&events, |e| {
        matches!(e, BatchEvent::AwaitingDecision { task: 1, .. })
    })
    .unwrap();
    let second_attempt = events
        .iter()
        .enumerate()
        .filter(|(_, (_, e))| matches!(e, BatchEvent::TaskStarted { task: 1, .. }))
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(awaiting < second_attempt);

    // Continue proceeded to the final task.
    assert!(position(&events, |e| matches!(e, BatchEvent::TaskStarted { task: 2, .. })).is_some());
}

#[tokio::test]
async fn test_abort_decision_finalizes_group_without_running_the_rest() {
    let (provider, mut decision_rx) = ChannelDecisions::new();
    tokio::spawn(async move {
        while let Some((_, reply)) = decision_rx.recv().await {
            let _ = reply.send(FailureDecision::Abort);
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![sh_group("r", &["true", "exit 3", "true"])];
    let outcome = session(groups, 0)
        .decisions(Arc::new(provider))
        .events(tx)
        .run()
        .await
        .unwrap();

    assert!(outcome.repos[0].aborted);
    assert!(!outcome.success());
    assert_eq!(outcome.counters.done(), 1);

    let events = collector.await.unwrap();
    assert!(position(&events, |e| matches!(e, BatchEvent::TaskStarted { task: 2, .. })).is_none());
}

#[tokio::test]
async fn test_scripted_decisions_replay_then_abort_when_exhausted() {
    let provider = ScriptedDecisions::new([FailureDecision::Continue]);
    let groups = vec![sh_group("s", &["exit 1", "exit 1", "true"])];
    let outcome = session(groups, 0)
        .decisions(Arc::new(provider))
        .run()
        .await
        .unwrap();

    // The first failure consumed the scripted Continue; the second
    // exhausted the script, which answers Abort from then on.
    assert!(outcome.repos[0].aborted);
    assert_eq!(outcome.counters.errors(), 2);
}

#[tokio::test]
async fn test_ignored_failure_continues_without_a_decision() {
    let groups = vec![TaskGroup::new(
        "batch r",
        RepoRef::new("r", "/tmp"),
        vec![
            sh_task("probe", "exit 9").with_ignore_failure(true),
            sh_task("work", "true"),
        ],
    )];
    // No decision provider is consulted: the default AbortOnError would
    // otherwise abort the group.
    let outcome = session(groups, 0).run().await.unwrap();
    assert!(outcome.success());
    assert_eq!(outcome.counters.errors(), 1);
}

#[tokio::test]
async fn test_global_abort_finalizes_everything() {
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![
        sh_group("long", &["sleep 10"]),
        sh_group("queued", &["true"]),
        sh_group("queued2", &["true"]),
    ];
    let session = session(groups, 1).events(tx);
    let abort = session.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        abort.cancel();
    });

    let started = Instant::now();
    let outcome = session.run().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(outcome.aborted);
    assert!(!outcome.success());
    assert_eq!(outcome.counters.done(), 3);
    assert!(outcome.repos.iter().all(|r| r.aborted));

    // The queued groups never ran.
    let events = collector.await.unwrap();
    assert!(position(&events, |e| matches!(e, BatchEvent::GroupStarted { group: 1, .. })).is_none());
    assert!(position(&events, |e| matches!(e, BatchEvent::GroupStarted { group: 2, .. })).is_none());
}

#[tokio::test]
async fn test_done_counter_is_monotonic_and_terminal() {
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = collect_events(rx);

    let groups = vec![
        sh_group("a", &["true"]),
        sh_group("b", &["exit 1"]),
        sh_group("c", &["true"]),
    ];
    let outcome = session(groups, 0)
        .decisions(Arc::new(ContinueOnError))
        .events(tx)
        .run()
        .await
        .unwrap();

    let events = collector.await.unwrap();
    let mut last_done = 0;
    for (_, event) in &events {
        if let BatchEvent::Progress(counters) = event {
            assert!(counters.done() >= last_done);
            last_done = counters.done();
        }
    }
    assert_eq!(last_done, 3);
    assert_eq!(outcome.counters.done(), outcome.counters.total());
    assert_eq!(outcome.counters.errors(), 1);
}

#[tokio::test]
async fn test_crash_marker_fails_the_task() {
    let groups = vec![sh_group("r", &["echo 'Stack trace:'; exit 0"])];
    let outcome = session(groups, 0).run().await.unwrap();
    assert!(!outcome.success());
    assert_eq!(outcome.counters.errors(), 1);
}

#[tokio::test]
async fn test_move_and_delete_task_kinds() {
    use crate::batch::task::TaskKind;

    let tmp = tempfile::tempdir().unwrap();
    let from = tmp.path().join("staging");
    let to = tmp.path().join("final");
    let junk = tmp.path().join("junk");
    std::fs::create_dir(&from).unwrap();
    std::fs::create_dir(&junk).unwrap();

    let groups = vec![TaskGroup::new(
        "relocate",
        RepoRef::new("r", tmp.path()),
        vec![
            Task::new(
                "move into place",
                TaskKind::MoveDir {
                    from: from.clone(),
                    to: to.clone(),
                },
            ),
            Task::new("clean up", TaskKind::DeleteDir { path: junk.clone() }),
        ],
    )];
    let outcome = session(groups, 0).run().await.unwrap();
    assert!(outcome.success());
    assert!(!from.exists());
    assert!(to.exists());
    assert!(!junk.exists());
}

#[tokio::test]
async fn test_tripped_launch_policy_vetoes_network_groups() {
    let policy = Arc::new(LaunchPolicy::new(1));
    policy.observe("fatal: Authentication failed for 'https://example.invalid/'");
    assert_eq!(policy.auth_failures(), 1);
    assert!(!policy.permits_network());

    let groups = vec![
        TaskGroup::new(
            "fetch r",
            RepoRef::new("r", "/tmp"),
            vec![Task::git("fetch", ["fetch", "--all"], false)],
        ),
        sh_group("local", &["true"]),
    ];
    let outcome = session(groups, 0)
        .launch_policy(policy)
        .run()
        .await
        .unwrap();

    assert!(outcome.repos[0].aborted);
    assert!(outcome.repos[1].success);
}

#[tokio::test]
async fn test_execution_log_has_a_line_per_repo() {
    let groups = vec![sh_group("a", &["echo out-a"]), sh_group("b", &["true"])];
    let outcome = session(groups, 0).run().await.unwrap();

    let log = outcome.log.render();
    assert!(log.contains("batch a"));
    assert!(log.contains("out-a"));
    assert!(log.contains("a: ok"));
    assert!(log.contains("b: ok"));
    assert!(outcome.summary().contains("2 of 2 done"));
}
