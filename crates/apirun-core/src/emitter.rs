//! Producer and consumer ends of a run's event stream.
//!
//! [`channel`] creates a bounded, ordered, single-producer stream. The
//! [`EventEmitter`] is the only write path to the run's Result Set: every
//! event is checked against the [`Lifecycle`], applied to the Result Set,
//! and only then published. Terminal methods consume the emitter, so no
//! event can follow `finished` or `interrupted`.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{CheckSet, Endpoint, ExecutionSettings, ResultsView, SchemaHandle, Status};
use crate::events::{EventKind, ExecutionEvent};
use crate::lifecycle::{Lifecycle, RunState};
use crate::metrics::METRICS;
use crate::{obs, Result};

/// Default number of events buffered between producer and consumer.
pub const DEFAULT_CAPACITY: usize = 64;

/// Create the emitter and stream for one run.
pub fn channel(schema: SchemaHandle, capacity: usize) -> (EventEmitter, EventStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let emitter = EventEmitter {
        run_id: Uuid::new_v4(),
        schema,
        results: ResultsView::new(),
        lifecycle: Lifecycle::new(),
        started: None,
        emitted: 0,
        sender,
        detached: false,
    };
    let stream = EventStream {
        receiver,
        done: false,
    };
    (emitter, stream)
}

/// Execution engine side of the protocol.
pub struct EventEmitter {
    run_id: Uuid,
    schema: SchemaHandle,
    results: ResultsView,
    lifecycle: Lifecycle,
    started: Option<Instant>,
    emitted: u64,
    sender: mpsc::Sender<ExecutionEvent>,
    /// Set once the stream has been dropped.
    detached: bool,
}

impl EventEmitter {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn schema(&self) -> &SchemaHandle {
        &self.schema
    }

    /// Read-only handle to this run's Result Set.
    pub fn results(&self) -> ResultsView {
        self.results.clone()
    }

    pub fn state(&self) -> &RunState {
        self.lifecycle.state()
    }

    /// Emit `Initialized`. Must be the first event.
    pub async fn initialized(
        &mut self,
        checks: CheckSet,
        settings: ExecutionSettings,
    ) -> Result<()> {
        let kind = EventKind::initialized(checks, settings);
        if let EventKind::Initialized { start_instant, .. } = &kind {
            if self.lifecycle.state() == &RunState::NotStarted {
                self.started = Some(*start_instant);
            }
        }
        self.emit(kind).await
    }

    /// Emit `BeforeExecution` and open `endpoint` in the Result Set.
    pub async fn before_execution(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.emit(EventKind::BeforeExecution {
            endpoint: endpoint.clone(),
        })
        .await
    }

    /// Record the endpoint's outcome and emit `AfterExecution`.
    pub async fn after_execution(
        &mut self,
        endpoint: &Endpoint,
        status: Status,
        diagnostics: Vec<String>,
    ) -> Result<()> {
        self.emit(EventKind::AfterExecution {
            endpoint: endpoint.clone(),
            status,
            diagnostics,
        })
        .await
    }

    /// Emit `Interrupted`. The endpoint in flight, if any, is left without
    /// a result and reported as incomplete.
    pub async fn interrupted(mut self) -> Result<ResultsView> {
        let in_flight = self.lifecycle.open_endpoint().cloned();
        self.emit(EventKind::Interrupted { in_flight }).await?;
        METRICS.inc_runs_interrupted();
        Ok(self.results)
    }

    /// Emit `Finished` with the elapsed time since `Initialized`.
    pub async fn finished(mut self) -> Result<ResultsView> {
        let duration_ms = self
            .started
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.emit(EventKind::Finished { duration_ms }).await?;
        Ok(self.results)
    }

    async fn emit(&mut self, kind: EventKind) -> Result<()> {
        let run_id = self.run_id.to_string();
        if let Err(violation) = self.lifecycle.advance(&kind) {
            obs::emit_protocol_violation(&run_id, &violation);
            return Err(violation.into());
        }
        self.apply(&kind)?;

        self.emitted += 1;
        obs::emit_event_emitted(&run_id, kind.name(), self.emitted);
        match &kind {
            EventKind::Initialized { checks, .. } => obs::emit_run_started(&run_id, checks.len()),
            EventKind::Finished { duration_ms } => {
                obs::emit_run_finished(&run_id, *duration_ms, &self.results.counts())
            }
            EventKind::Interrupted { in_flight } => {
                obs::emit_run_interrupted(&run_id, in_flight.as_ref())
            }
            _ => {}
        }

        let event = ExecutionEvent::new(self.schema.clone(), self.results.clone(), kind);
        METRICS.inc_events_emitted();
        if self.sender.send(event).await.is_err() && !self.detached {
            debug!(run_id = %run_id, "event stream dropped, continuing without consumers");
            self.detached = true;
        }
        Ok(())
    }

    /// Mirror an accepted event into the Result Set.
    fn apply(&self, kind: &EventKind) -> Result<()> {
        kind.apply_to(&mut self.results.write())?;
        if let EventKind::AfterExecution { .. } = kind {
            METRICS.inc_endpoints_tested();
        }
        Ok(())
    }
}

/// Consumer side: yields events in emission order and ends after the
/// terminal event.
pub struct EventStream {
    receiver: mpsc::Receiver<ExecutionEvent>,
    done: bool,
}

impl EventStream {
    /// Next event, or `None` once the terminal event has been yielded (or
    /// the emitter was dropped without one).
    pub async fn recv(&mut self) -> Option<ExecutionEvent> {
        futures::StreamExt::next(self).await
    }

    /// Whether the terminal event has been yielded.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Stream for EventStream {
    type Item = ExecutionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.done = true;
                    self.receiver.close();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("done", &self.done)
            .finish()
    }
}
