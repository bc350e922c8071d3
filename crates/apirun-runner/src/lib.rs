//! apirun runner - the execution engine side of the event protocol
//!
//! Provides a sequential run engine that:
//! - Tests each endpoint through an `EndpointExecutor`
//! - Emits the run's lifecycle events in order
//! - Stops with `interrupted` on external cancellation, or early on
//!   fail-fast

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;

// Re-export key types
pub use cancel::{cancellation, CancelHandle, CancelSignal};
pub use config::RunConfig;
pub use engine::{Engine, RunOutcome, RunTask};
pub use error::{Result, RunnerError};
pub use executor::{CommandExecutor, EndpointExecutor, Outcome};
