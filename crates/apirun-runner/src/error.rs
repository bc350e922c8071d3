//! Error types for run execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    /// Rejected before `Initialized` could be emitted.
    #[error("invalid run configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] apirun_core::Error),

    #[error("run task failed: {0}")]
    Join(String),
}

impl From<apirun_core::InvariantViolation> for RunnerError {
    fn from(violation: apirun_core::InvariantViolation) -> Self {
        RunnerError::Core(violation.into())
    }
}

/// Result type for run execution
pub type Result<T> = std::result::Result<T, RunnerError>;
