//! Opaque run configuration handed to `Initialized`.
//!
//! The lifecycle never looks inside these; they are carried so consumers
//! can show what a run was configured with.

use serde::{Deserialize, Serialize};

/// Identifiers of the checks evaluated against every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckSet(Vec<String>);

impl CheckSet {
    pub fn new<I, S>(checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(checks.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Input generation / execution settings, passed through to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Upper bound of generated examples per endpoint.
    pub max_examples: u32,

    /// Per-example deadline in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,

    /// Seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_examples: 100,
            deadline_ms: None,
            seed: None,
        }
    }
}
