//! Run summaries for consumers.
//!
//! - `RunReport`: the rolled-up verdict read from a terminal event
//! - `ProgressReporter`: a handler that writes one line per closed endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::consumer::EventHandler;
use crate::domain::{Endpoint, ResultEntry, Status, StatusCounts};
use crate::events::{EventKind, ExecutionEvent};
use crate::Result;

/// Summary of a completed or interrupted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Rollup of all recorded statuses.
    pub status: Status,
    pub counts: StatusCounts,
    /// Whether the run ended with `interrupted`.
    pub interrupted: bool,
    /// Endpoint left without a result by the interruption.
    pub incomplete: Option<Endpoint>,
    /// Run duration; only known for finished runs.
    pub duration_ms: Option<u64>,
    /// Entries whose status is not `success`, in run order.
    pub problems: Vec<ResultEntry>,
}

impl RunReport {
    /// Build the report from a run's terminal event.
    ///
    /// Returns `None` for non-terminal events.
    pub fn from_terminal(event: &ExecutionEvent) -> Option<Self> {
        let (interrupted, duration_ms) = match &event.kind {
            EventKind::Finished { duration_ms } => (false, Some(*duration_ms)),
            EventKind::Interrupted { .. } => (true, None),
            _ => return None,
        };

        Some(event.results.with(|set| RunReport {
            status: set.rollup(),
            counts: set.counts(),
            interrupted,
            incomplete: set.incomplete().cloned(),
            duration_ms,
            problems: set
                .entries()
                .iter()
                .filter(|e| e.status != Status::Success)
                .cloned()
                .collect(),
        }))
    }

    /// Number of endpoints with a recorded result.
    pub fn total(&self) -> usize {
        self.counts.total()
    }

    /// Whether the run completed and every endpoint succeeded.
    pub fn passed(&self) -> bool {
        !self.interrupted && self.status == Status::Success
    }

    /// One-line summary.
    pub fn message(&self) -> String {
        let tally = format!(
            "{} success, {} failure, {} error",
            self.counts.success, self.counts.failure, self.counts.error
        );
        if self.interrupted {
            let mut msg = format!(
                "run interrupted after {} endpoint(s) ({})",
                self.total(),
                tally
            );
            if self.incomplete.is_some() {
                msg.push_str("; 1 endpoint left incomplete");
            }
            msg
        } else {
            format!(
                "{} endpoint(s) tested in {} ms: {} -> {}",
                self.total(),
                self.duration_ms.unwrap_or(0),
                tally,
                self.status
            )
        }
    }
}

/// Writes progress lines as endpoints open and close.
pub struct ProgressReporter<W> {
    out: W,
    completed: usize,
}

impl<W: Write + Send> ProgressReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, completed: 0 }
    }

    /// Number of endpoints closed so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> EventHandler for ProgressReporter<W> {
    async fn handle(&mut self, event: &ExecutionEvent) -> Result<()> {
        match &event.kind {
            EventKind::Initialized { checks, .. } => {
                writeln!(
                    self.out,
                    "testing {} with {} check(s)",
                    event.schema.location,
                    checks.len()
                )?;
            }
            EventKind::BeforeExecution { .. } => {}
            EventKind::AfterExecution {
                endpoint,
                status,
                diagnostics,
            } => {
                self.completed += 1;
                writeln!(self.out, "[{}] {} ... {}", self.completed, endpoint, status)?;
                for line in diagnostics {
                    writeln!(self.out, "    {}", line)?;
                }
            }
            EventKind::Interrupted { in_flight } => {
                if let Some(endpoint) = in_flight {
                    writeln!(self.out, "{} ... interrupted", endpoint)?;
                }
            }
            EventKind::Finished { .. } => {}
        }

        if let Some(report) = RunReport::from_terminal(event) {
            writeln!(self.out, "{}", report.message())?;
        }
        Ok(())
    }
}
