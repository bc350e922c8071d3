//! Process-wide counters for apirun runs.
//!
//! The emitter bumps them as events go out; the engine calls
//! [`Metrics::flush`] once a run reaches its terminal event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Metrics {
    events_emitted: AtomicU64,
    endpoints_tested: AtomicU64,
    runs_interrupted: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_emitted: AtomicU64::new(0),
            endpoints_tested: AtomicU64::new(0),
            runs_interrupted: AtomicU64::new(0),
        }
    }

    pub fn inc_events_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_emitted", "counter incremented");
    }

    pub fn inc_endpoints_tested(&self) {
        self.endpoints_tested.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "endpoints_tested", "counter incremented");
    }

    pub fn inc_runs_interrupted(&self) {
        self.runs_interrupted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_interrupted", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_emitted = self.events_emitted(),
            endpoints_tested = self.endpoints_tested(),
            runs_interrupted = self.runs_interrupted(),
        );
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn endpoints_tested(&self) -> u64 {
        self.endpoints_tested.load(Ordering::Relaxed)
    }

    pub fn runs_interrupted(&self) -> u64 {
        self.runs_interrupted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.events_emitted(), 0);
        m.inc_events_emitted();
        m.inc_events_emitted();
        assert_eq!(m.events_emitted(), 2);

        m.inc_endpoints_tested();
        assert_eq!(m.endpoints_tested(), 1);

        m.inc_runs_interrupted();
        assert_eq!(m.runs_interrupted(), 1);
    }
}
