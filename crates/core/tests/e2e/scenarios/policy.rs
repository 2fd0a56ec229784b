//! Orchestration rules: test-only, ephemeral cycle, run-all, setup/teardown.

use std::time::Duration;

use suitectl_core::{Phase, SetupOutcome, SuiteError, SuiteStatus, TestOptions};

use crate::helpers::testbed::{TestBed, descriptor};

/// Ledger names `a`, request `b` -> conflict and not a single launch.
#[tokio::test]
async fn test_conflicting_suite_launches_nothing() {
    // Given
    let mut bed = TestBed::new(&["a", "b"]);
    bed.ledger().write("a").expect("seed ledger");

    // When
    let err = bed
        .orchestrator
        .test(Some("b"), None, &TestOptions::default())
        .await
        .expect_err("should conflict");

    // Then
    match err {
        SuiteError::ConflictingSuite { running, requested } => {
            assert_eq!(running, "a");
            assert_eq!(requested, "b");
        }
        other => panic!("expected ConflictingSuite, got {other:?}"),
    }
    assert!(bed.commands.launches().is_empty(), "no process may be launched");
    assert_eq!(bed.running().as_deref(), Some("a"));
}

#[tokio::test]
async fn test_unknown_suite_launches_nothing() {
    let mut bed = TestBed::new(&["a"]);

    let err = bed
        .orchestrator
        .test(Some("missing"), None, &TestOptions::default())
        .await
        .expect_err("unknown suite");

    assert!(matches!(err, SuiteError::UnknownSuite(name) if name == "missing"));
    assert!(bed.commands.launches().is_empty());
}

/// A running suite only gets its tests run, however often it is asked.
#[tokio::test]
async fn test_running_suite_is_tested_in_place_repeatedly() {
    let mut bed = TestBed::new(&["a", "b"]);
    bed.ledger().write("a").expect("seed ledger");

    for requested in [None, Some("a"), None] {
        bed.orchestrator
            .test(requested, None, &TestOptions::default())
            .await
            .expect("test-only run should pass");
    }

    assert_eq!(bed.commands.launches(), vec!["test:a", "test:a", "test:a"]);
    assert_eq!(bed.running().as_deref(), Some("a"));
}

#[tokio::test]
async fn test_requested_suite_runs_full_cycle() {
    let mut bed = TestBed::new(&["a"]);

    bed.orchestrator
        .test(Some("a"), None, &TestOptions::default())
        .await
        .expect("cycle should pass");

    assert_eq!(
        bed.commands.launches(),
        vec!["setup:a", "test:a", "teardown:a"]
    );
    assert_eq!(bed.running(), None, "ledger is empty after the cycle");
}

#[tokio::test]
async fn test_failing_tests_still_tear_down() {
    let mut bed = TestBed::new(&["a"]);
    bed.commands.script("test:a", "exit 1");

    let err = bed
        .orchestrator
        .test(Some("a"), None, &TestOptions::default())
        .await
        .expect_err("tests fail");

    assert!(matches!(
        err,
        SuiteError::ProcessFailure {
            phase: Phase::Test,
            ..
        }
    ));
    assert_eq!(
        bed.commands.launches(),
        vec!["setup:a", "test:a", "teardown:a"]
    );
    assert_eq!(bed.running(), None);
}

/// A teardown failure after passing tests is logged, the run still passes.
#[tokio::test]
async fn test_teardown_failure_does_not_override_passing_tests() {
    let mut bed = TestBed::new(&["a"]);
    bed.commands.script("teardown:a", "exit 1");

    bed.orchestrator
        .test(Some("a"), None, &TestOptions::default())
        .await
        .expect("test outcome wins");

    assert_eq!(bed.running(), None, "ledger cleared despite teardown failure");
}

#[tokio::test]
async fn test_run_all_goes_through_suites_in_name_order() {
    let mut bed = TestBed::new(&["c", "a", "b"]);

    bed.orchestrator
        .test(None, None, &TestOptions::default())
        .await
        .expect("all suites pass");

    assert_eq!(
        bed.commands.launches(),
        vec![
            "setup:a", "test:a", "teardown:a", "setup:b", "test:b", "teardown:b", "setup:c",
            "test:c", "teardown:c",
        ]
    );
}

/// X passes, Y fails setup: Y is torn down and Z never starts.
#[tokio::test]
async fn test_run_all_stops_at_first_failure() {
    let mut bed = TestBed::new(&["x", "y", "z"]);
    let ledger = bed.ledger_path();
    bed.commands
        .script("test:x", &format!("grep -qx x '{}'", ledger.display()));
    bed.commands.script("setup:y", "exit 1");

    let err = bed
        .orchestrator
        .test(None, None, &TestOptions::default())
        .await
        .expect_err("y fails setup");

    match err {
        SuiteError::ProcessFailure { suite, phase, .. } => {
            assert_eq!(suite, "y");
            assert_eq!(phase, Phase::Setup);
        }
        other => panic!("expected setup failure of y, got {other:?}"),
    }
    assert_eq!(
        bed.commands.launches(),
        vec!["setup:x", "test:x", "teardown:x", "setup:y", "teardown:y"]
    );
    assert_eq!(bed.running(), None);
}

/// Each suite of a batch is recorded in the ledger before its tests start
/// and stays recorded until its teardown command has run.
#[tokio::test]
async fn test_run_all_records_each_suite_while_it_is_active() {
    let mut bed = TestBed::new(&["x", "y"]);
    let ledger = bed.ledger_path();
    let ledger = ledger.display();
    let marker = bed.dir.path().join("teardown-saw-x");

    bed.commands.script("setup:x", &format!("test ! -s '{ledger}'"));
    bed.commands.script("test:x", &format!("grep -qx x '{ledger}'"));
    bed.commands.script(
        "teardown:x",
        &format!("grep -qx x '{ledger}' && touch '{}'", marker.display()),
    );
    bed.commands.script("setup:y", &format!("test ! -s '{ledger}'"));
    bed.commands.script("test:y", &format!("grep -qx y '{ledger}'"));

    bed.orchestrator
        .test(None, None, &TestOptions::default())
        .await
        .expect("ledger should name the active suite during its tests");

    assert!(marker.exists(), "teardown of x should still see x recorded");
    assert_eq!(bed.running(), None, "ledger is cleared after the batch");
}

#[tokio::test]
async fn test_options_reach_test_command() {
    let mut bed = TestBed::new(&["a"]);
    bed.ledger().write("a").expect("seed ledger");
    let options = TestOptions {
        headless: true,
        only_forbidden: false,
    };

    bed.orchestrator
        .test(None, Some(Duration::from_secs(5)), &options)
        .await
        .expect("tests pass");

    assert_eq!(bed.commands.test_options(), vec![options]);
    assert_eq!(bed.commands.test_timeouts(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_timeout_falls_back_to_suite_then_default() {
    let mut bed = TestBed::with_suites(vec![
        ("a", descriptor().with_test_timeout(Duration::from_secs(120))),
        ("b", descriptor()),
    ]);

    bed.orchestrator
        .test(None, None, &TestOptions::default())
        .await
        .expect("all pass");

    assert_eq!(
        bed.commands.test_timeouts(),
        vec![Duration::from_secs(120), Duration::from_secs(60)]
    );
}

// =============================================================================
// setup / teardown / status
// =============================================================================

#[tokio::test]
async fn setup_records_suite_and_is_idempotent() {
    let mut bed = TestBed::new(&["a"]);

    let first = bed.orchestrator.setup("a").await.expect("setup");
    let second = bed.orchestrator.setup("a").await.expect("second setup");

    assert_eq!(first, SetupOutcome::Started);
    assert_eq!(second, SetupOutcome::AlreadyRunning);
    assert_eq!(bed.commands.launches(), vec!["setup:a"]);
    assert_eq!(bed.running().as_deref(), Some("a"));
}

#[tokio::test]
async fn setup_refuses_second_suite() {
    let mut bed = TestBed::new(&["a", "b"]);
    bed.orchestrator.setup("a").await.expect("setup a");

    let err = bed.orchestrator.setup("b").await.expect_err("b conflicts");

    assert!(matches!(err, SuiteError::ConflictingSuite { .. }));
    assert_eq!(bed.commands.launches(), vec!["setup:a"]);
}

#[tokio::test]
async fn teardown_without_name_uses_ledger() {
    let mut bed = TestBed::new(&["a"]);
    bed.orchestrator.setup("a").await.expect("setup");

    let name = bed.orchestrator.teardown(None).await.expect("teardown");

    assert_eq!(name, "a");
    assert_eq!(bed.commands.launches(), vec!["setup:a", "teardown:a"]);
    assert_eq!(bed.running(), None);
}

#[tokio::test]
async fn teardown_without_running_suite_fails() {
    let mut bed = TestBed::new(&["a"]);

    let err = bed
        .orchestrator
        .teardown(None)
        .await
        .expect_err("nothing to tear down");

    assert!(matches!(err, SuiteError::NoRunningSuite));
    assert!(bed.commands.launches().is_empty());
}

#[tokio::test]
async fn teardown_of_other_suite_conflicts() {
    let mut bed = TestBed::new(&["a", "b"]);
    bed.ledger().write("a").expect("seed ledger");

    let err = bed
        .orchestrator
        .teardown(Some("b"))
        .await
        .expect_err("b is not running");

    assert!(matches!(err, SuiteError::ConflictingSuite { .. }));
    assert_eq!(bed.running().as_deref(), Some("a"));
}

#[tokio::test]
async fn teardown_clears_ledger_naming_unregistered_suite() {
    let mut bed = TestBed::new(&["a"]);
    bed.ledger().write("gone").expect("seed ledger");

    let err = bed
        .orchestrator
        .teardown(None)
        .await
        .expect_err("unregistered suite");

    assert!(matches!(err, SuiteError::UnknownSuite(name) if name == "gone"));
    assert_eq!(bed.running(), None);
    assert!(bed.commands.launches().is_empty());
}

#[tokio::test]
async fn status_reports_ledger_and_registration() {
    let bed = TestBed::new(&["a"]);
    assert_eq!(
        bed.orchestrator.status().expect("status"),
        SuiteStatus {
            running: None,
            registered: false
        }
    );

    bed.ledger().write("a").expect("seed ledger");
    let status = bed.orchestrator.status().expect("status");
    assert_eq!(status.running.as_deref(), Some("a"));
    assert!(status.registered);

    let json = serde_json::to_value(&status).expect("serialize");
    assert_eq!(json["running"], "a");
}

#[tokio::test]
async fn serve_refuses_when_a_suite_is_running() {
    let mut bed = TestBed::new(&["a", "b"]);
    bed.ledger().write("a").expect("seed ledger");

    let err = bed.orchestrator.serve("b").await.expect_err("conflict");

    assert!(matches!(err, SuiteError::ConflictingSuite { .. }));
    assert!(bed.commands.launches().is_empty());
}

#[tokio::test]
async fn serve_tears_down_after_interrupt() {
    let mut bed = TestBed::new(&["a"]);
    bed.interrupt_after(Duration::from_millis(100));

    bed.orchestrator.serve("a").await.expect("serve");

    assert_eq!(bed.commands.launches(), vec!["setup:a", "teardown:a"]);
    assert_eq!(bed.running(), None);
}
