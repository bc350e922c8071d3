//! Error types for the run lifecycle protocol

use thiserror::Error;

/// Protocol misuse detected while emitting or replaying a run's events.
///
/// These are contract errors on the producer side. They are fatal to the
/// run and are propagated to the run entry point, never converted into an
/// endpoint status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{event} emitted before initialized")]
    NotInitialized { event: String },

    #[error("initialized emitted more than once")]
    AlreadyInitialized,

    #[error("{event} emitted after terminal event {terminal}")]
    AfterTerminal { event: String, terminal: String },

    #[error("after_execution for {endpoint} without an open before_execution")]
    NoOpenEndpoint { endpoint: String },

    #[error("after_execution for {actual} while {expected} is open")]
    EndpointMismatch { expected: String, actual: String },

    #[error("before_execution for {next} while {open} is still open")]
    EndpointAlreadyOpen { open: String, next: String },

    #[error("finished while {endpoint} is still open")]
    FinishedWithOpenEndpoint { endpoint: String },

    #[error("interrupted reports in-flight {reported:?} but open endpoint is {open:?}")]
    InFlightMismatch {
        reported: Option<String>,
        open: Option<String>,
    },

    #[error("stream ended without a terminal event")]
    MissingTerminal,

    #[error("record #{sequence} carries a Result Set that disagrees with the events before it")]
    SnapshotMismatch { sequence: u64 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invariant violation: {0}")]
    Protocol(#[from] InvariantViolation),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;
