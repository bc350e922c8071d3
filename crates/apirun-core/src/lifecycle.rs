//! Run lifecycle state machine.
//!
//! `NotStarted -> Initialized -> Running <-> AwaitingResult -> {Finished, Interrupted}`
//!
//! Terminal states absorb: any event after one is a violation. The emitter
//! drives this machine before publishing each event, and consumers can run
//! a recorded stream through it to check ordering.

use serde::Serialize;

use crate::domain::Endpoint;
use crate::error::InvariantViolation;
use crate::events::EventKind;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "endpoint", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Initialized,
    Running,
    /// `before_execution` seen, waiting for the matching `after_execution`.
    AwaitingResult(Endpoint),
    Finished,
    Interrupted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Interrupted)
    }

    fn name(&self) -> &'static str {
        match self {
            RunState::NotStarted => "not_started",
            RunState::Initialized => "initialized",
            RunState::Running => "running",
            RunState::AwaitingResult(_) => "awaiting_result",
            RunState::Finished => "finished",
            RunState::Interrupted => "interrupted",
        }
    }
}

/// Validates event order for one run.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: RunState,
    before_count: u64,
    after_count: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RunState::NotStarted,
            before_count: 0,
            after_count: 0,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Number of `before_execution` events accepted so far.
    pub fn before_count(&self) -> u64 {
        self.before_count
    }

    /// Number of `after_execution` events accepted so far.
    pub fn after_count(&self) -> u64 {
        self.after_count
    }

    /// Endpoint currently awaiting its result.
    pub fn open_endpoint(&self) -> Option<&Endpoint> {
        match &self.state {
            RunState::AwaitingResult(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Check that `kind` may come next and move to the following state.
    ///
    /// On error the state is left unchanged.
    pub fn advance(&mut self, kind: &EventKind) -> Result<(), InvariantViolation> {
        if self.state.is_terminal() {
            return Err(InvariantViolation::AfterTerminal {
                event: kind.name().to_string(),
                terminal: self.state.name().to_string(),
            });
        }

        let next = match (&self.state, kind) {
            (RunState::NotStarted, EventKind::Initialized { .. }) => RunState::Initialized,
            (RunState::NotStarted, other) => {
                return Err(InvariantViolation::NotInitialized {
                    event: other.name().to_string(),
                })
            }
            (_, EventKind::Initialized { .. }) => {
                return Err(InvariantViolation::AlreadyInitialized)
            }

            (RunState::AwaitingResult(open), EventKind::BeforeExecution { endpoint }) => {
                return Err(InvariantViolation::EndpointAlreadyOpen {
                    open: open.to_string(),
                    next: endpoint.to_string(),
                })
            }
            (_, EventKind::BeforeExecution { endpoint }) => {
                RunState::AwaitingResult(endpoint.clone())
            }

            (RunState::AwaitingResult(open), EventKind::AfterExecution { endpoint, .. }) => {
                if open != endpoint {
                    return Err(InvariantViolation::EndpointMismatch {
                        expected: open.to_string(),
                        actual: endpoint.to_string(),
                    });
                }
                RunState::Running
            }
            (_, EventKind::AfterExecution { endpoint, .. }) => {
                return Err(InvariantViolation::NoOpenEndpoint {
                    endpoint: endpoint.to_string(),
                })
            }

            (RunState::AwaitingResult(open), EventKind::Finished { .. }) => {
                return Err(InvariantViolation::FinishedWithOpenEndpoint {
                    endpoint: open.to_string(),
                })
            }
            (_, EventKind::Finished { .. }) => RunState::Finished,

            (state, EventKind::Interrupted { in_flight }) => {
                let open = match state {
                    RunState::AwaitingResult(open) => Some(open),
                    _ => None,
                };
                if open != in_flight.as_ref() {
                    return Err(InvariantViolation::InFlightMismatch {
                        reported: in_flight.as_ref().map(ToString::to_string),
                        open: open.map(ToString::to_string),
                    });
                }
                RunState::Interrupted
            }
        };

        match kind {
            EventKind::BeforeExecution { .. } => self.before_count += 1,
            EventKind::AfterExecution { .. } => self.after_count += 1,
            _ => {}
        }
        self.state = next;
        Ok(())
    }

    /// Fail unless the run reached a terminal state.
    pub fn finish(&self) -> Result<(), InvariantViolation> {
        if self.state.is_terminal() {
            Ok(())
        } else {
            Err(InvariantViolation::MissingTerminal)
        }
    }
}

/// Run a whole sequence of kinds through a fresh [`Lifecycle`].
pub fn validate_sequence<'a, I>(kinds: I) -> Result<Lifecycle, InvariantViolation>
where
    I: IntoIterator<Item = &'a EventKind>,
{
    let mut lifecycle = Lifecycle::new();
    for kind in kinds {
        lifecycle.advance(kind)?;
    }
    lifecycle.finish()?;
    Ok(lifecycle)
}
