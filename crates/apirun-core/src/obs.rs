//! Structured observability hooks for the run lifecycle.
//!
//! This module provides:
//! - The run-scoped `apirun.run` span
//! - Emission functions for lifecycle milestones: start, event emitted,
//!   endpoint outcome, finish, interruption, protocol violation
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::{info, info_span, warn, Span};

use crate::domain::{Endpoint, Status, StatusCounts};
use crate::error::InvariantViolation;

/// Span tagged with the run id, for the task driving a run.
///
/// Attach it with `tracing::Instrument` so it follows the task across
/// `.await` points.
pub fn run_span(run_id: &str) -> Span {
    info_span!("apirun.run", run_id = %run_id)
}

/// Emit event: run initialized with its number of checks.
pub fn emit_run_started(run_id: &str, check_count: usize) {
    info!(event = "run.started", run_id = %run_id, checks = check_count);
}

/// Emit event: one lifecycle event published.
pub fn emit_event_emitted(run_id: &str, kind: &str, seq: u64) {
    tracing::debug!(event = "run.event_emitted", run_id = %run_id, kind = %kind, seq = seq);
}

/// Emit event: an endpoint was closed with a status.
pub fn emit_endpoint_finished(run_id: &str, endpoint: &Endpoint, status: Status, elapsed_ms: u64) {
    info!(
        event = "endpoint.finished",
        run_id = %run_id,
        endpoint = %endpoint,
        status = %status,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: run finished with duration and per-status tallies.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, counts: &StatusCounts) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = counts.success,
        failure = counts.failure,
        error = counts.error,
    );
}

/// Emit event: run interrupted, possibly with an endpoint in flight (warning level).
pub fn emit_run_interrupted(run_id: &str, in_flight: Option<&Endpoint>) {
    match in_flight {
        Some(endpoint) => {
            warn!(event = "run.interrupted", run_id = %run_id, in_flight = %endpoint)
        }
        None => warn!(event = "run.interrupted", run_id = %run_id),
    }
}

/// Emit event: the producer broke the event protocol (warning level).
pub fn emit_protocol_violation(run_id: &str, violation: &InvariantViolation) {
    warn!(event = "run.protocol_violation", run_id = %run_id, error = %violation);
}
