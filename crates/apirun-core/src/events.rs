//! Run lifecycle events.
//!
//! A run emits exactly one `Initialized`, then a `BeforeExecution` /
//! `AfterExecution` pair per endpoint, then exactly one terminal event
//! (`Finished` or `Interrupted`). Nothing follows the terminal event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::domain::{
    CheckSet, Endpoint, ExecutionSettings, ResultSet, ResultsView, SchemaHandle, Status,
};
use crate::error::InvariantViolation;

// ============================================================================
// EVENT TYPES
// ============================================================================

/// A single lifecycle event.
///
/// `results` is the run's shared Result Set handle; every event of the same
/// run carries the same handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Schema under test.
    pub schema: SchemaHandle,

    /// Holder for all endpoint results of this run.
    pub results: ResultsView,

    #[serde(flatten)]
    pub kind: EventKind,
}

/// The closed set of lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Runner is set up; checks and settings are fixed for the run.
    Initialized {
        checks: CheckSet,
        settings: ExecutionSettings,
        started_at: DateTime<Utc>,
        /// Monotonic start, used for the run duration.
        #[serde(skip, default = "Instant::now")]
        start_instant: Instant,
    },

    /// An endpoint is about to be tested.
    ///
    /// One endpoint test may exercise many generated examples.
    BeforeExecution { endpoint: Endpoint },

    /// An endpoint has been tested.
    AfterExecution {
        endpoint: Endpoint,
        status: Status,
        /// Captured executor output
        #[serde(default)]
        diagnostics: Vec<String>,
    },

    /// The run was cancelled from outside (Ctrl-C, SIGTERM, deadline).
    ///
    /// `in_flight` is the endpoint that was open when the run stopped; it
    /// has no result entry.
    Interrupted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        in_flight: Option<Endpoint>,
    },

    /// The run completed. No more events after this point.
    Finished { duration_ms: u64 },
}

impl EventKind {
    /// Create an `Initialized` kind stamped with the current time.
    pub fn initialized(checks: CheckSet, settings: ExecutionSettings) -> Self {
        EventKind::Initialized {
            checks,
            settings,
            started_at: Utc::now(),
            start_instant: Instant::now(),
        }
    }

    /// The wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Initialized { .. } => "initialized",
            EventKind::BeforeExecution { .. } => "before_execution",
            EventKind::AfterExecution { .. } => "after_execution",
            EventKind::Interrupted { .. } => "interrupted",
            EventKind::Finished { .. } => "finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Interrupted { .. } | EventKind::Finished { .. }
        )
    }

    /// Endpoint this event is about, for the per-endpoint kinds.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            EventKind::BeforeExecution { endpoint } | EventKind::AfterExecution { endpoint, .. } => {
                Some(endpoint)
            }
            _ => None,
        }
    }

    /// Mirror this event into `set`.
    ///
    /// Opens on `BeforeExecution`, closes on `AfterExecution` and parks the
    /// open endpoint on `Interrupted`.
    pub fn apply_to(&self, set: &mut ResultSet) -> Result<(), InvariantViolation> {
        match self {
            EventKind::BeforeExecution { endpoint } => set.open(endpoint),
            EventKind::AfterExecution {
                endpoint,
                status,
                diagnostics,
            } => set.record(endpoint, *status, diagnostics.clone()),
            EventKind::Interrupted { .. } => {
                set.mark_interrupted();
                Ok(())
            }
            EventKind::Initialized { .. } | EventKind::Finished { .. } => Ok(()),
        }
    }
}

impl ExecutionEvent {
    pub fn new(schema: SchemaHandle, results: ResultsView, kind: EventKind) -> Self {
        Self {
            schema,
            results,
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.kind.endpoint()
    }
}

// ============================================================================
// TESTS
// ============================================================================
