//! End-to-end tests for ExplorationDriver -> DeviceClient -> CommandRunner,
//! followed by the transition analyzer.
//!
//! A mock simctl records every invocation and writes capture files of
//! scripted sizes, so the full household probe runs without a simulator.
//! Time is paused, so settle delays and pauses complete instantly.

mod common;

use std::sync::Arc;

use common::{household_client, MockSimctl};

use simprobe_core::action::Action;
use simprobe_core::analyzer::{Classification, TransitionAnalyzer};
use simprobe_core::explorer::{ExplorationDriver, ExplorationObserver, NoopObserver};
use simprobe_core::script::{Attempt, ProbeScript, ProbeStep};
use simprobe_core::session::{ExplorationLog, LogEntry, SessionError};

const HOUSEHOLD_CAPTURES: usize = 24;

#[derive(Default)]
struct CollectingObserver {
    steps: Vec<u8>,
    actions: Vec<(u8, &'static str, bool)>,
}

impl ExplorationObserver for CollectingObserver {
    fn step_started(&mut self, step: &ProbeStep) {
        self.steps.push(step.ordinal);
    }

    fn action_finished(&mut self, entry: &LogEntry) {
        self.actions.push((entry.step, entry.action.name(), entry.result.succeeded));
    }
}

// ---------------------------------------------------------------------------
// 1. Full household probe with every command succeeding
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_household_probe_records_every_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new());
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path()));

    let script = ProbeScript::household();
    let log = driver
        .run(&script, ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    assert_eq!(log.entries().len(), script.action_count());
    assert_eq!(log.failure_count(), 0);
    assert_eq!(log.artifacts().count(), HOUSEHOLD_CAPTURES);

    let names: Vec<&str> = log.artifacts().map(|a| a.file_name()).collect();
    assert_eq!(names.first(), Some(&"01_app_launched.png"));
    assert_eq!(names.last(), Some(&"08_final_state.png"));
    assert!(log.artifacts().all(|a| a.exists()));
}

#[tokio::test(start_paused = true)]
async fn test_actions_are_issued_in_script_order() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new());
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path()));

    driver
        .run(&ProbeScript::household(), ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    let subs = mock.subcommands();
    assert_eq!(subs[..4], ["launch", "screenshot", "tap", "screenshot"]);
    // Form step: tap, type, capture for each field.
    let form_start = subs.iter().position(|s| s == "type").unwrap() - 1;
    assert_eq!(
        subs[form_start..form_start + 6],
        ["tap", "type", "screenshot", "tap", "type", "screenshot"]
    );
    assert_eq!(subs.last().map(String::as_str), Some("screenshot"));
    assert!(!subs.iter().any(|s| s == "terminate"));
}

// ---------------------------------------------------------------------------
// 2. Failures never stop the run
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_failed_launch_still_runs_full_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new().failing("launch"));
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path()));

    let script = ProbeScript::household();
    let log = driver
        .run(&script, ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    assert_eq!(log.entries().len(), script.action_count());
    assert_eq!(log.failure_count(), 1);
    assert!(!log.entries()[0].result.succeeded);
    assert_eq!(log.artifacts().count(), HOUSEHOLD_CAPTURES);

    // The analyzer still runs against what was captured.
    let verdict = TransitionAnalyzer::default().analyze_log(&log);
    assert_eq!(verdict.artifact_count, HOUSEHOLD_CAPTURES);
    assert_eq!(verdict.classification, Classification::NeedsManualReview);
}

#[tokio::test(start_paused = true)]
async fn test_failed_screenshots_produce_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new().failing("screenshot").failing("launch"));
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path()));

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    assert_eq!(log.artifacts().count(), 0);
    assert!(log
        .entries()
        .iter()
        .filter(|e| matches!(e.action, Action::Screenshot { .. }))
        .all(|e| e.artifact.is_none()));

    let verdict = TransitionAnalyzer::default().analyze_log(&log);
    assert_eq!(verdict.artifact_count, 0);
    assert_eq!(verdict.classification, Classification::LikelyFailure);
}

// ---------------------------------------------------------------------------
// 3. Capture sizes flow through to the verdict
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_changing_captures_classify_as_likely_success() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockSimctl::new().capture_sizes(&[100_000, 100_000, 160_000, 160_000, 90_000, 200_000, 200_000, 205_000]),
    );
    let driver = ExplorationDriver::new(household_client(mock, dir.path()));

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;
    let verdict = TransitionAnalyzer::default().analyze_log(&log);

    assert_eq!(verdict.distinct_screen_estimate, 3);
    assert_eq!(verdict.classification, Classification::LikelySuccess);
}

// ---------------------------------------------------------------------------
// 4. Observer, termination, persistence
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_observer_sees_each_step_and_action() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new().failing("tap"));
    let driver = ExplorationDriver::new(household_client(mock, dir.path()));
    let mut observer = CollectingObserver::default();

    let script = ProbeScript::household();
    driver
        .run(&script, ExplorationLog::in_memory(dir.path()), &mut observer)
        .await;

    assert_eq!(observer.steps, [1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(observer.actions.len(), script.action_count());
    assert!(observer
        .actions
        .iter()
        .filter(|(_, name, _)| *name == "tap")
        .all(|(_, _, ok)| !ok));
    assert_eq!(observer.actions[0], (1, "launch", true));
}

#[tokio::test(start_paused = true)]
async fn test_terminate_after_appends_terminate() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new());
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path())).terminate_after(true);

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    let last = log.entries().last().unwrap();
    assert_eq!(last.action, Action::Terminate);
    assert_eq!(last.step, 8);
    assert_eq!(mock.subcommands().last().map(String::as_str), Some("terminate"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_capture_names_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new());
    let driver = ExplorationDriver::new(household_client(mock.clone(), dir.path()));

    // Two steps sharing ordinal and label would collide on the same file.
    let step = ProbeStep::new(1, "Tap", "same", vec![Attempt::tap(10, 10, 0)]);
    let script = ProbeScript {
        name: "collide".to_string(),
        steps: vec![step.clone(), step],
    };
    let log = driver
        .run(&script, ExplorationLog::in_memory(dir.path()), &mut NoopObserver)
        .await;

    assert_eq!(log.artifacts().count(), 1);
    assert_eq!(log.failure_count(), 1);
    assert_eq!(mock.subcommands(), ["tap", "screenshot", "tap"]);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_log_reanalyzes_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new().capture_sizes(&[0, 80_000, 0, 80_000, 0, 80_000]));
    let driver = ExplorationDriver::new(household_client(mock, dir.path()));

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::with_log_file(dir.path()), &mut NoopObserver)
        .await;
    assert!(log.is_persisted());
    let live = TransitionAnalyzer::default().analyze_log(&log);
    drop(log);

    let reloaded = ExplorationLog::load(dir.path()).unwrap();
    let replayed = TransitionAnalyzer::default().analyze_log(&reloaded);

    assert_eq!(live, replayed);
    assert_eq!(replayed.classification, Classification::LikelySuccess);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_cannot_reuse_run_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSimctl::new());
    let driver = ExplorationDriver::new(household_client(mock, dir.path()));

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::create(dir.path()).unwrap(), &mut NoopObserver)
        .await;
    let recorded = log.entries().len();
    drop(log);

    let err = ExplorationLog::create(dir.path()).unwrap_err();
    assert!(matches!(err, SessionError::RunExists(_)));
    assert_eq!(ExplorationLog::load(dir.path()).unwrap().entries().len(), recorded);
}

#[tokio::test(start_paused = true)]
async fn test_moved_run_directory_reanalyzes_identically() {
    let root = tempfile::tempdir().unwrap();
    let original = root.path().join("run_a");
    let mock = Arc::new(MockSimctl::new().capture_sizes(&[0, 80_000, 0, 80_000, 0, 80_000]));
    let driver = ExplorationDriver::new(household_client(mock, &original));

    let log = driver
        .run(&ProbeScript::household(), ExplorationLog::create(&original).unwrap(), &mut NoopObserver)
        .await;
    let live = TransitionAnalyzer::default().analyze_log(&log);
    drop(log);

    let archived = root.path().join("archived_run");
    std::fs::rename(&original, &archived).unwrap();

    let replayed = TransitionAnalyzer::default().analyze_log(&ExplorationLog::load(&archived).unwrap());
    assert_eq!(replayed.artifact_count, HOUSEHOLD_CAPTURES);
    assert_eq!(replayed, live);
    assert_eq!(replayed.classification, Classification::LikelySuccess);
}
