//! Per-endpoint outcomes and the run-wide Result Set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::endpoint::Endpoint;
use crate::error::InvariantViolation;

/// Outcome of testing one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// All checks passed.
    Success,
    /// At least one check reported an expected-vs-actual mismatch.
    Failure,
    /// Execution could not complete (connection refused, unresolvable schema, ...).
    Error,
}

impl Status {
    fn severity(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
            Status::Error => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One closed endpoint test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub endpoint: Endpoint,
    pub status: Status,
    /// Captured output of the executor, in order.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

/// Number of entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub failure: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.success + self.failure + self.error
    }
}

/// Accumulates outcomes for a single run.
///
/// Entries are appended in the order endpoints are closed. At most one
/// endpoint is open at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    entries: Vec<ResultEntry>,

    /// Endpoint between `before_execution` and `after_execution`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    open: Option<Endpoint>,

    /// Endpoint left without a result because the run was interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    incomplete: Option<Endpoint>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `endpoint` as in flight.
    pub fn open(&mut self, endpoint: &Endpoint) -> Result<(), InvariantViolation> {
        if let Some(open) = &self.open {
            return Err(InvariantViolation::EndpointAlreadyOpen {
                open: open.to_string(),
                next: endpoint.to_string(),
            });
        }
        self.open = Some(endpoint.clone());
        Ok(())
    }

    /// Close the open endpoint with its outcome.
    ///
    /// Fails when nothing is open (including a second record for an entry
    /// that was already closed) or when a different endpoint is open.
    pub fn record(
        &mut self,
        endpoint: &Endpoint,
        status: Status,
        diagnostics: Vec<String>,
    ) -> Result<(), InvariantViolation> {
        match &self.open {
            None => {
                return Err(InvariantViolation::NoOpenEndpoint {
                    endpoint: endpoint.to_string(),
                })
            }
            Some(open) if open != endpoint => {
                return Err(InvariantViolation::EndpointMismatch {
                    expected: open.to_string(),
                    actual: endpoint.to_string(),
                })
            }
            Some(_) => {}
        }

        self.open = None;
        self.entries.push(ResultEntry {
            endpoint: endpoint.clone(),
            status,
            diagnostics,
        });
        Ok(())
    }

    /// Park the open endpoint (if any) as incomplete. Returns it.
    pub fn mark_interrupted(&mut self) -> Option<Endpoint> {
        self.incomplete = self.open.take();
        self.incomplete.clone()
    }

    /// Run-level status: `error` > `failure` > `success`. Empty is `success`.
    pub fn rollup(&self) -> Status {
        self.entries
            .iter()
            .map(|e| e.status)
            .max_by_key(|s| s.severity())
            .unwrap_or(Status::Success)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn open_endpoint(&self) -> Option<&Endpoint> {
        self.open.as_ref()
    }

    /// Endpoint cut short by an interruption, if any.
    pub fn incomplete(&self) -> Option<&Endpoint> {
        self.incomplete.as_ref()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in &self.entries {
            match entry.status {
                Status::Success => counts.success += 1,
                Status::Failure => counts.failure += 1,
                Status::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.status == Status::Failure)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.status == Status::Error)
    }
}

/// Shared read-only handle to a run's [`ResultSet`].
///
/// Every event of a run carries a clone of the same handle, so reading it
/// always shows the current state of the run rather than the state at the
/// time the event was emitted. Only the emitter in this crate can write.
/// Serializing writes an inline snapshot.
#[derive(Clone, Default)]
pub struct ResultsView {
    inner: Arc<RwLock<ResultSet>>,
}

impl ResultsView {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ResultSet> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ResultSet> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ResultSet {
        self.read().clone()
    }

    /// Run a closure against the current state without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&ResultSet) -> R) -> R {
        f(&self.read())
    }

    pub fn rollup(&self) -> Status {
        self.read().rollup()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        self.read().counts()
    }

    pub fn incomplete(&self) -> Option<Endpoint> {
        self.read().incomplete().cloned()
    }

    /// Whether both handles point at the same Result Set.
    pub fn same_run(&self, other: &ResultsView) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ResultSet> for ResultsView {
    fn from(set: ResultSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(set)),
        }
    }
}

impl fmt::Debug for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.read();
        f.debug_struct("ResultsView")
            .field("entries", &set.len())
            .field("rollup", &set.rollup())
            .finish()
    }
}

impl PartialEq for ResultsView {
    fn eq(&self, other: &Self) -> bool {
        self.same_run(other) || *self.read() == *other.read()
    }
}

impl Serialize for ResultsView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResultsView {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ResultSet::deserialize(deserializer).map(ResultsView::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_a() -> Endpoint {
        Endpoint::new("GET", "/a")
    }

    fn post_b() -> Endpoint {
        Endpoint::new("POST", "/b")
    }

    fn set_with(statuses: &[Status]) -> ResultSet {
        let mut set = ResultSet::new();
        for (i, status) in statuses.iter().enumerate() {
            let endpoint = Endpoint::new("GET", format!("/{}", i));
            set.open(&endpoint).expect("open");
            set.record(&endpoint, *status, vec![]).expect("record");
        }
        set
    }

    #[test]
    fn test_rollup_precedence() {
        use Status::*;
        assert_eq!(set_with(&[Success, Failure, Error]).rollup(), Error);
        assert_eq!(set_with(&[Error, Failure]).rollup(), Error);
        assert_eq!(set_with(&[Success, Failure]).rollup(), Failure);
        assert_eq!(set_with(&[Success, Success]).rollup(), Success);
        assert_eq!(set_with(&[]).rollup(), Success);
    }

    #[test]
    fn test_record_without_open_fails() {
        let mut set = ResultSet::new();
        let err = set
            .record(&get_a(), Status::Success, vec![])
            .expect_err("no open endpoint");
        assert!(matches!(err, InvariantViolation::NoOpenEndpoint { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn test_record_twice_fails() {
        let mut set = ResultSet::new();
        set.open(&get_a()).expect("open");
        set.record(&get_a(), Status::Success, vec![]).expect("first");
        let err = set
            .record(&get_a(), Status::Failure, vec![])
            .expect_err("second record");
        assert!(matches!(err, InvariantViolation::NoOpenEndpoint { .. }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_record_for_other_endpoint_fails() {
        let mut set = ResultSet::new();
        set.open(&get_a()).expect("open");
        let err = set
            .record(&post_b(), Status::Success, vec![])
            .expect_err("mismatch");
        assert!(matches!(err, InvariantViolation::EndpointMismatch { .. }));
        assert_eq!(set.open_endpoint(), Some(&get_a()));
    }

    #[test]
    fn test_open_while_open_fails() {
        let mut set = ResultSet::new();
        set.open(&get_a()).expect("open");
        let err = set.open(&post_b()).expect_err("already open");
        assert!(matches!(err, InvariantViolation::EndpointAlreadyOpen { .. }));
    }

    #[test]
    fn test_mark_interrupted_moves_open_endpoint() {
        let mut set = ResultSet::new();
        set.open(&get_a()).expect("open");
        assert_eq!(set.mark_interrupted(), Some(get_a()));
        assert!(set.open_endpoint().is_none());
        assert_eq!(set.incomplete(), Some(&get_a()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_counts() {
        use Status::*;
        let set = set_with(&[Success, Failure, Failure, Error]);
        let counts = set.counts();
        assert_eq!(counts.success, 1);
        assert_eq!(counts.failure, 2);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.total(), 4);
        assert!(set.has_failures());
        assert!(set.has_errors());
    }

    #[test]
    fn test_view_clones_share_state() {
        let view = ResultsView::new();
        let other = view.clone();
        {
            let mut set = view.write();
            set.open(&get_a()).expect("open");
            set.record(&get_a(), Status::Failure, vec!["boom".into()])
                .expect("record");
        }
        assert!(view.same_run(&other));
        assert_eq!(other.len(), 1);
        assert_eq!(other.rollup(), Status::Failure);
        assert!(!view.same_run(&ResultsView::new()));
    }

    #[test]
    fn test_view_serializes_snapshot() {
        let view = ResultsView::from(set_with(&[Status::Success]));
        let json = serde_json::to_value(&view).expect("serialize");
        assert_eq!(json["entries"][0]["status"], "success");
        assert!(json.get("open").is_none());

        let back: ResultsView = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, view);
        assert!(!back.same_run(&view));
    }
}
