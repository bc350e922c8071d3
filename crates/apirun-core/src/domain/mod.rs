//! Domain models for apirun.
//!
//! - `Endpoint` / `SchemaHandle`: identity of what is under test
//! - `CheckSet` / `ExecutionSettings`: opaque run configuration
//! - `Status`, `ResultSet`, `ResultsView`: per-endpoint outcomes and their rollup

pub mod endpoint;
pub mod results;
pub mod settings;

pub use endpoint::{Endpoint, SchemaHandle};
pub use results::{ResultEntry, ResultSet, ResultsView, Status, StatusCounts};
pub use settings::{CheckSet, ExecutionSettings};
