mod common;

use std::collections::VecDeque;
use std::time::Duration;

use cdp_cloud::coolify::{Deployment, DeploymentDetail};
use cdp_deploy::watcher::{self, AppCheck, Next, Observation, Phase};
use cdp_deploy::{ReclaimedPolicy, Verdict, WatchPolicy, WatchState};
use common::{MockCoolify, application, deployment, status};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn log_payload(lines: usize) -> String {
    let records: Vec<String> = (1..=lines)
        .map(|i| format!(r#"{{"output":"step {i}"}}"#))
        .collect();
    format!("[{}]", records.join(","))
}

fn detail(status: &str, logs: &str) -> DeploymentDetail {
    DeploymentDetail {
        status: status.to_owned(),
        logs: logs.to_owned(),
    }
}

fn seen(uuid: &str, list_status: &str, detail: Option<DeploymentDetail>) -> Observation {
    Observation::Deployment {
        uuid: uuid.to_owned(),
        list_status: list_status.to_owned(),
        detail,
    }
}

/// Each call to the list endpoint returns the next entry.
fn script_list(coolify: &mut MockCoolify, polls: Vec<Vec<Deployment>>) {
    let times = polls.len();
    let mut polls = VecDeque::from(polls);
    coolify
        .expect_list_deployments()
        .times(times)
        .returning(move |_| Ok(polls.pop_front().unwrap_or_default()));
}

async fn run(coolify: &MockCoolify, policy: WatchPolicy) -> (Verdict, String) {
    let mut out = Vec::new();
    let verdict = watcher::watch(
        coolify,
        "app-1",
        policy,
        &CancellationToken::new(),
        &mut out,
    )
    .await;
    (verdict, String::from_utf8(out).unwrap())
}

// ── Scenarios ──

#[tokio::test(start_paused = true)]
async fn queued_to_finished_succeeds_in_four_polls() {
    let statuses = ["queued", "queued", "running", "finished"];
    let mut coolify = MockCoolify::new();
    script_list(
        &mut coolify,
        statuses
            .iter()
            .map(|s| vec![deployment("dep-1", s)])
            .collect(),
    );
    let mut poll = 0;
    coolify
        .expect_get_deployment()
        .withf(|uuid| uuid == "dep-1")
        .times(4)
        .returning(move |_| {
            poll += 1;
            Ok(detail(statuses[poll - 1], &log_payload(poll)))
        });
    coolify.expect_get_application().never();

    let start = tokio::time::Instant::now();
    let (verdict, out) = run(&coolify, WatchPolicy::default()).await;

    assert_eq!(verdict, Verdict::Succeeded);
    assert_eq!(out, "step 1\nstep 2\nstep 3\nstep 4\n");
    // Three sleeps between four polls.
    assert!(start.elapsed() >= Duration::from_secs(6));
    assert!(start.elapsed() < Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn vanished_deployment_with_exited_app_fails() {
    let mut coolify = MockCoolify::new();
    script_list(
        &mut coolify,
        vec![vec![deployment("dep-1", "running")], vec![], vec![], vec![]],
    );
    coolify
        .expect_get_deployment()
        .times(1)
        .returning(|_| Ok(detail("running", "")));
    coolify
        .expect_get_application()
        .times(1)
        .returning(|_| Ok(application("exited")));

    let (verdict, _) = run(&coolify, WatchPolicy::default()).await;

    assert_eq!(
        verdict,
        Verdict::Failed {
            status: "exited".to_owned()
        }
    );
    assert!(!verdict.is_success());
}

#[tokio::test(start_paused = true)]
async fn vanished_deployment_with_running_app_succeeds() {
    let mut coolify = MockCoolify::new();
    script_list(
        &mut coolify,
        vec![vec![deployment("dep-1", "running")], vec![], vec![], vec![]],
    );
    coolify
        .expect_get_deployment()
        .returning(|_| Ok(detail("running", "")));
    coolify
        .expect_get_application()
        .times(1)
        .returning(|_| Ok(application("running:healthy")));

    let (verdict, _) = run(&coolify, WatchPolicy::default()).await;
    assert_eq!(verdict, Verdict::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn never_seen_deployment_gives_up_after_fifteen_polls() {
    let mut coolify = MockCoolify::new();
    script_list(&mut coolify, vec![vec![]; 15]);
    coolify.expect_get_deployment().never();
    coolify.expect_get_application().never();

    let (verdict, out) = run(&coolify, WatchPolicy::default()).await;

    assert_eq!(verdict, Verdict::NoDeployment);
    assert!(out.is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_list_failures_are_unreachable() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_list_deployments()
        .times(5)
        .returning(|_| Err(status(502)));

    let (verdict, _) = run(&coolify, WatchPolicy::default()).await;
    assert_eq!(verdict, Verdict::Unreachable);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_bounded() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_list_deployments()
        .times(120)
        .returning(|_| Ok(vec![deployment("dep-1", "in_progress")]));
    coolify
        .expect_get_deployment()
        .returning(|_| Ok(detail("in_progress", "")));
    coolify
        .expect_get_application()
        .times(1)
        .returning(|_| Ok(application("starting")));

    let (verdict, _) = run(&coolify, WatchPolicy::default()).await;
    assert_eq!(verdict, Verdict::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_with_running_app_succeeds() {
    let policy = WatchPolicy {
        max_attempts: 3,
        ..WatchPolicy::default()
    };
    let mut coolify = MockCoolify::new();
    coolify
        .expect_list_deployments()
        .times(3)
        .returning(|_| Ok(vec![deployment("dep-1", "queued")]));
    coolify
        .expect_get_deployment()
        .returning(|_| Ok(detail("queued", "")));
    coolify
        .expect_get_application()
        .times(1)
        .returning(|_| Ok(application("running")));

    let (verdict, _) = run(&coolify, policy).await;
    assert_eq!(verdict, Verdict::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_watch() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_list_deployments()
        .returning(|_| Ok(vec![deployment("dep-1", "queued")]));
    coolify
        .expect_get_deployment()
        .returning(|_| Ok(detail("queued", "")));
    coolify.expect_get_application().never();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let mut out = Vec::new();
    let verdict = watcher::watch(&coolify, "app-1", WatchPolicy::default(), &token, &mut out).await;
    assert_eq!(verdict, Verdict::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn verbose_prints_status_changes() {
    let mut coolify = MockCoolify::new();
    script_list(
        &mut coolify,
        vec![
            vec![deployment("dep-1", "queued")],
            vec![deployment("dep-1", "queued")],
            vec![deployment("dep-1", "finished")],
        ],
    );
    let mut statuses = VecDeque::from(["queued", "queued", "finished"]);
    coolify
        .expect_get_deployment()
        .returning(move |_| Ok(detail(statuses.pop_front().unwrap_or("finished"), "")));

    let policy = WatchPolicy {
        verbose: true,
        ..WatchPolicy::default()
    };
    let (verdict, out) = run(&coolify, policy).await;

    assert!(verdict.is_success());
    assert_eq!(out, "==> status: queued\n==> status: finished\n");
}

// ── Transitions ──

#[test]
fn detail_status_wins_over_list_status() {
    let mut state = WatchState::new(WatchPolicy::default());
    let step = state.step(seen("dep-1", "failed", Some(detail("running", ""))));
    assert_eq!(step.next, Next::Continue);

    let step = state.step(seen("dep-1", "running", Some(detail("failed", ""))));
    assert_eq!(
        step.next,
        Next::Done(Verdict::Failed {
            status: "failed".to_owned()
        })
    );
}

#[test]
fn list_status_used_when_detail_missing() {
    let mut state = WatchState::new(WatchPolicy::default());
    let step = state.step(seen("dep-1", "Finished", None));
    assert_eq!(step.next, Next::Done(Verdict::Succeeded));
    assert!(step.logs.is_empty());
    assert_eq!(state.phase(), Phase::Finished);
}

#[test]
fn new_deployment_resets_log_offset() {
    let mut state = WatchState::new(WatchPolicy::default());
    let first = state.step(seen("dep-1", "running", Some(detail("running", "build a\n"))));
    assert_eq!(first.logs, "build a\n");

    let again = state.step(seen("dep-1", "running", Some(detail("running", "build a\n"))));
    assert!(again.logs.is_empty());

    let second = state.step(seen("dep-2", "running", Some(detail("running", "build b\n"))));
    assert_eq!(second.logs, "build b\n");
    assert_eq!(state.tracked_uuid(), Some("dep-2"));
}

#[test]
fn new_deployment_reports_its_status_again() {
    let mut state = WatchState::new(WatchPolicy::default());
    let first = state.step(seen("dep-1", "running", Some(detail("running", ""))));
    assert_eq!(first.status_change.as_deref(), Some("running"));

    let again = state.step(seen("dep-1", "running", Some(detail("running", ""))));
    assert_eq!(again.status_change, None);

    let second = state.step(seen("dep-2", "running", Some(detail("running", ""))));
    assert_eq!(second.status_change.as_deref(), Some("running"));
}

#[test]
fn empty_polls_while_waiting_never_ask_the_application() {
    let mut state = WatchState::new(WatchPolicy::default());
    for _ in 0..14 {
        assert_eq!(state.step(Observation::Empty).next, Next::Continue);
    }
    assert_eq!(state.phase(), Phase::Waiting);
    assert_eq!(
        state.step(Observation::Empty).next,
        Next::Done(Verdict::NoDeployment)
    );
}

#[test]
fn list_failures_reset_on_success() {
    let mut state = WatchState::new(WatchPolicy::default());
    for _ in 0..4 {
        state.step(Observation::ListFailed);
    }
    state.step(Observation::Empty);
    for _ in 0..4 {
        assert_eq!(state.step(Observation::ListFailed).next, Next::Continue);
    }
    assert_eq!(
        state.step(Observation::ListFailed).next,
        Next::Done(Verdict::Unreachable)
    );
}

#[test]
fn reclaimed_policy_decides_ambiguous_status() {
    let tracked = |reclaimed| {
        let mut state = WatchState::new(WatchPolicy {
            reclaimed,
            ..WatchPolicy::default()
        });
        state.step(seen("dep-1", "running", None));
        state.step(Observation::Empty);
        state.step(Observation::Empty);
        let next = state.step(Observation::Empty).next;
        assert_eq!(next, Next::CheckApplication(AppCheck::Reclaimed));
        state
    };

    let mut keep = tracked(ReclaimedPolicy::KeepPolling);
    assert_eq!(
        keep.on_application_status(AppCheck::Reclaimed, Some("starting")),
        Next::Continue
    );
    // The streak starts over before the application is asked again.
    assert_eq!(keep.step(Observation::Empty).next, Next::Continue);

    let mut success = tracked(ReclaimedPolicy::AssumeSuccess);
    assert_eq!(
        success.on_application_status(AppCheck::Reclaimed, None),
        Next::Done(Verdict::Succeeded)
    );

    let mut failure = tracked(ReclaimedPolicy::AssumeFailure);
    assert!(matches!(
        failure.on_application_status(AppCheck::Reclaimed, Some("restarting")),
        Next::Done(Verdict::Failed { .. })
    ));
}

#[test]
fn final_check_needs_running_application() {
    let policy = WatchPolicy {
        max_attempts: 1,
        ..WatchPolicy::default()
    };
    let mut state = WatchState::new(policy);
    let step = state.step(seen("dep-1", "queued", None));
    assert_eq!(step.next, Next::CheckApplication(AppCheck::Final));
    assert_eq!(
        state.on_application_status(AppCheck::Final, Some("exited")),
        Next::Done(Verdict::TimedOut)
    );
}

// ── Properties ──

proptest! {
    /// Whatever way the log grows, every byte is emitted exactly once.
    #[test]
    fn emitted_logs_equal_final_log(pieces in prop::collection::vec("[a-z ]{1,12}\n", 1..20)) {
        let mut state = WatchState::new(WatchPolicy::default());
        let mut blob = String::new();
        let mut emitted = String::new();

        for piece in &pieces {
            blob.push_str(piece);
            let step = state.step(seen("dep-1", "running", Some(detail("running", &blob))));
            emitted.push_str(&step.logs);
            prop_assert!(blob.starts_with(&emitted));
        }

        prop_assert_eq!(emitted, blob);
    }

    #[test]
    fn polls_never_exceed_budget(max_attempts in 1u32..40, empties in 0usize..60) {
        let policy = WatchPolicy { max_attempts, unseen_limit: u32::MAX, ..WatchPolicy::default() };
        let mut state = WatchState::new(policy);
        for _ in 0..empties {
            match state.step(Observation::Empty).next {
                Next::Continue => {}
                _ => break,
            }
        }
        prop_assert!(state.attempts() <= max_attempts);
    }
}
