//! Run configuration and identity.

use apirun_core::{CheckSet, ExecutionSettings, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Configuration for one run.
///
/// `checks` and `settings` are handed to `Initialized` and to the
/// executor untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Checks evaluated against every response.
    pub checks: CheckSet,

    /// Input generation / execution settings.
    pub settings: ExecutionSettings,

    /// Stop after the first endpoint that does not succeed.
    pub fail_fast: bool,

    /// Events buffered between the engine and its consumers.
    pub channel_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checks: CheckSet::new(["not_a_server_error"]),
            settings: ExecutionSettings::default(),
            fail_fast: false,
            channel_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl RunConfig {
    pub fn with_checks(mut self, checks: CheckSet) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Deterministic SHA-256 over the ordered checks and the settings.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for check in self.checks.iter() {
            hasher.update(check.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(self.settings.max_examples.to_le_bytes());
        hasher.update(self.settings.deadline_ms.unwrap_or(0).to_le_bytes());
        hasher.update(self.settings.seed.unwrap_or(0).to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_default() {
        let config = RunConfig::default();
        assert_eq!(config.checks.len(), 1);
        assert!(!config.fail_fast);
        assert_eq!(config.channel_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_digest_deterministic() {
        let a = RunConfig::default().with_checks(CheckSet::new(["a", "b"]));
        let b = RunConfig::default().with_checks(CheckSet::new(["a", "b"]));
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_digest_order_sensitive() {
        let a = RunConfig::default().with_checks(CheckSet::new(["a", "b"]));
        let b = RunConfig::default().with_checks(CheckSet::new(["b", "a"]));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_covers_settings() {
        let a = RunConfig::default();
        let b = RunConfig::default().with_settings(ExecutionSettings {
            seed: Some(7),
            ..ExecutionSettings::default()
        });
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_fail_fast_not_in_digest() {
        let a = RunConfig::default();
        let b = RunConfig::default().with_fail_fast(true);
        assert_eq!(a.digest(), b.digest());
    }
}
