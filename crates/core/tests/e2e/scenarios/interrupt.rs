//! Operator interrupts: cancellable phases and `run_until_interrupted`.

use std::time::{Duration, Instant};

use suitectl_core::{CommandSpec, Phase, ProcessError, ProcessRunner, SuiteError, TestOptions};
use tokio::sync::oneshot;

use crate::helpers::testbed::TestBed;

#[tokio::test]
async fn interrupt_while_running_returns_ok_without_waiting_for_exit() {
    let runner = ProcessRunner::new(false);
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(());
    });
    let started = Instant::now();

    runner
        .run_until_interrupted(&CommandSpec::new("sleep").arg("5"), async {
            let _ = rx.await;
        })
        .await
        .expect("interrupt is a clean exit");

    assert!(
        started.elapsed() < Duration::from_secs(4),
        "should not wait for the command to finish"
    );
}

#[tokio::test]
async fn failing_command_returns_before_interrupt() {
    let runner = ProcessRunner::new(false);

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run_until_interrupted(
            &CommandSpec::new("sh").arg("-c").arg("exit 3"),
            std::future::pending::<()>(),
        ),
    )
    .await
    .expect("should not wait for an interrupt")
    .expect_err("exit 3 is a failure");

    match err {
        ProcessError::Failed { status, .. } => assert_eq!(status.code(), Some(3)),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_command_keeps_waiting_for_interrupt() {
    let runner = ProcessRunner::new(false);
    let spec = CommandSpec::new("true");

    // Without an interrupt the call does not return.
    let pending = tokio::time::timeout(
        Duration::from_millis(300),
        runner.run_until_interrupted(&spec, std::future::pending::<()>()),
    )
    .await;
    assert!(pending.is_err(), "should still be waiting for the interrupt");

    // With a later interrupt it returns Ok.
    runner
        .run_until_interrupted(&spec, tokio::time::sleep(Duration::from_millis(100)))
        .await
        .expect("interrupt after success is Ok");
}

#[tokio::test]
async fn launch_error_is_returned() {
    let runner = ProcessRunner::new(false);
    let err = runner
        .run_until_interrupted(
            &CommandSpec::new("/nonexistent/suitectl-missing-binary"),
            std::future::pending::<()>(),
        )
        .await
        .expect_err("missing binary");
    assert!(matches!(err, ProcessError::Launch { .. }));
}

/// The interrupt is only observed after a successful spawn, so an interrupt
/// that is already pending still lets the command start.
#[tokio::test]
async fn already_pending_interrupt_still_spawns_command() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let marker = dir.path().join("spawned");
    let runner = ProcessRunner::new(false);

    runner
        .run_until_interrupted(
            &CommandSpec::new("touch").arg(marker.display().to_string()),
            std::future::ready(()),
        )
        .await
        .expect("immediate interrupt is Ok");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !marker.exists() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(marker.exists(), "command should have been spawned");
}

#[tokio::test]
async fn interrupted_setup_is_cleaned_up() {
    let mut bed = TestBed::new(&["a"]);
    bed.commands.script("setup:a", "sleep 30");
    bed.interrupt_after(Duration::from_millis(200));
    let started = Instant::now();

    let err = bed
        .orchestrator
        .test(Some("a"), None, &TestOptions::default())
        .await
        .expect_err("setup interrupted");

    assert!(matches!(
        err,
        SuiteError::Interrupted {
            phase: Phase::Setup,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(bed.commands.launches(), vec!["setup:a", "teardown:a"]);
    assert_eq!(bed.running(), None);
}

#[tokio::test]
async fn interrupted_tests_still_tear_down_ephemeral_suite() {
    let mut bed = TestBed::new(&["a"]);
    bed.commands.script("test:a", "sleep 30");
    bed.interrupt_after(Duration::from_millis(200));

    let err = bed
        .orchestrator
        .test(Some("a"), None, &TestOptions::default())
        .await
        .expect_err("tests interrupted");

    assert!(matches!(
        err,
        SuiteError::Interrupted {
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
