//! Observability tests for run lifecycle tracing.
//!
//! These verify that structured tracing events are emitted for the key
//! lifecycle milestones.

use apirun_core::{
    channel, emit_endpoint_finished, emit_protocol_violation, emit_run_finished,
    emit_run_interrupted, emit_run_started, CheckSet, Endpoint, ExecutionSettings,
    InvariantViolation, run_span, SchemaHandle, Status, StatusCounts,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_run_started_logs_run_id() {
    emit_run_started("run-123", 3);
    assert!(logs_contain("run.started"));
    assert!(logs_contain("run-123"));
}

#[traced_test]
#[test]
fn test_emit_endpoint_finished_logs_status() {
    emit_endpoint_finished("run-456", &Endpoint::new("GET", "/a"), Status::Failure, 12);
    assert!(logs_contain("endpoint.finished"));
    assert!(logs_contain("failure"));
}

#[traced_test]
#[test]
fn test_emit_run_finished_logs_counts() {
    let counts = StatusCounts {
        success: 2,
        failure: 1,
        error: 0,
    };
    emit_run_finished("run-789", 5000, &counts);
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("duration_ms=5000"));
}

#[traced_test]
#[test]
fn test_emit_run_interrupted_names_in_flight_endpoint() {
    emit_run_interrupted("run-int", Some(&Endpoint::new("POST", "/b")));
    assert!(logs_contain("run.interrupted"));
    assert!(logs_contain("POST /b"));
}

#[traced_test]
#[test]
fn test_emit_protocol_violation_logs_warning() {
    emit_protocol_violation("run-err", &InvariantViolation::AlreadyInitialized);
    assert!(logs_contain("run.protocol_violation"));
    assert!(logs_contain("WARN"));
}

#[traced_test]
#[test]
fn test_run_span_tags_events_with_run_id() {
    run_span("test-span-run").in_scope(|| tracing::info!("inside span"));
    assert!(logs_contain("test-span-run"));
}

#[traced_test]
#[tokio::test]
async fn test_emitter_logs_lifecycle() {
    let (mut emitter, _stream) = channel(SchemaHandle::new("openapi.json"), 8);
    emitter
        .initialized(CheckSet::new(["not_a_server_error"]), ExecutionSettings::default())
        .await
        .expect("init");
    emitter.finished().await.expect("finish");

    assert!(logs_contain("run.started"));
    assert!(logs_contain("run.finished"));
}
