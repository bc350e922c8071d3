//! apirun core
//!
//! The event protocol of an API conformance run and the aggregation of its
//! results:
//! - `ExecutionEvent`: the five lifecycle events (initialized, before/after
//!   execution, interrupted, finished)
//! - `ResultSet` / `ResultsView`: per-endpoint outcomes and their rollup
//! - `Lifecycle`: the ordering rules, shared by producers and consumers
//! - `EventEmitter` / `EventStream`: the ordered channel between the
//!   execution engine and its observers
//! - `EventHandler`, `EventRecorder`, `RunReport`: the consumer side

pub mod consumer;
pub mod domain;
pub mod emitter;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod metrics;
pub mod obs;
pub mod recorder;
pub mod report;
pub mod telemetry;

pub use consumer::{dispatch, EventHandler};
pub use domain::{
    CheckSet, Endpoint, ExecutionSettings, ResultEntry, ResultSet, ResultsView, SchemaHandle,
    Status, StatusCounts,
};
pub use emitter::{channel, EventEmitter, EventStream, DEFAULT_CAPACITY};
pub use error::{Error, InvariantViolation, Result};
pub use events::{EventKind, ExecutionEvent};
pub use lifecycle::{validate_sequence, Lifecycle, RunState};
pub use metrics::METRICS;
pub use obs::{
    emit_endpoint_finished, emit_event_emitted, emit_protocol_violation, emit_run_finished,
    emit_run_interrupted, emit_run_started, run_span,
};
pub use recorder::{read_ndjson, replay, write_ndjson, EventRecord, EventRecorder};
pub use report::{ProgressReporter, RunReport};
pub use telemetry::init_tracing;

/// apirun version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
