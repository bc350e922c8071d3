//! Event log recorder.
//!
//! Keeps an append-only, ordered log of a run's events and persists it as
//! newline-delimited JSON (one discriminated record per line). Each record
//! holds the Result Set as it stood right after that event, rebuilt from the
//! recorded events rather than read from the live shared handle, so a
//! consumer lagging behind the engine never sees later results in earlier
//! records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::debug;
use uuid::Uuid;

use crate::consumer::EventHandler;
use crate::domain::{ResultSet, ResultsView};
use crate::error::InvariantViolation;
use crate::events::ExecutionEvent;
use crate::lifecycle::Lifecycle;
use crate::report::RunReport;
use crate::Result;

/// One recorded event with its position in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence number in the run's event stream, starting at 0.
    pub sequence: u64,

    /// Run this event belongs to.
    pub run_id: Uuid,

    /// When the recorder saw the event.
    pub recorded_at: DateTime<Utc>,

    pub event: ExecutionEvent,
}

/// Records the events of one run.
#[derive(Debug)]
pub struct EventRecorder {
    run_id: Uuid,
    records: Vec<EventRecord>,
    /// Result Set as of the last recorded event.
    state: ResultSet,
}

impl EventRecorder {
    pub fn new(run_id: Uuid) -> Self {
        debug!(run_id = %run_id, "initializing event recorder");
        Self {
            run_id,
            records: Vec::new(),
            state: ResultSet::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append an event. Returns its sequence number.
    ///
    /// Fails if the event cannot follow the ones already recorded.
    pub fn record_event(&mut self, event: &ExecutionEvent) -> Result<u64> {
        event.kind.apply_to(&mut self.state)?;
        let sequence = self.records.len() as u64;
        let detached = ExecutionEvent::new(
            event.schema.clone(),
            ResultsView::from(self.state.clone()),
            event.kind.clone(),
        );
        self.records.push(EventRecord {
            sequence,
            run_id: self.run_id,
            recorded_at: Utc::now(),
            event: detached,
        });
        debug!("recorded event #{} for run {}", sequence, self.run_id);
        Ok(sequence)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }

    /// Write all records as NDJSON.
    pub fn write_ndjson<W: Write>(&self, out: W) -> Result<()> {
        write_ndjson(&self.records, out)
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    async fn handle(&mut self, event: &ExecutionEvent) -> Result<()> {
        self.record_event(event)?;
        Ok(())
    }
}

/// Write records as NDJSON, one record per line.
pub fn write_ndjson<W: Write>(records: &[EventRecord], mut out: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Read NDJSON records. Blank lines are skipped.
pub fn read_ndjson<R: BufRead>(input: R) -> Result<Vec<EventRecord>> {
    let mut records = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Check a recorded run against the lifecycle and summarize it.
///
/// Records must be in sequence order. The Result Set is rebuilt from the
/// events themselves and every record's snapshot must match it; the report
/// comes from the rebuilt set.
pub fn replay(records: &[EventRecord]) -> Result<RunReport> {
    let mut lifecycle = Lifecycle::new();
    let mut rebuilt = ResultSet::new();
    let mut report = None;
    for record in records {
        let kind = &record.event.kind;
        lifecycle.advance(kind)?;
        kind.apply_to(&mut rebuilt)?;
        if record.event.results.snapshot() != rebuilt {
            return Err(InvariantViolation::SnapshotMismatch {
                sequence: record.sequence,
            }
            .into());
        }
        if kind.is_terminal() {
            let terminal = ExecutionEvent::new(
                record.event.schema.clone(),
                ResultsView::from(rebuilt.clone()),
                kind.clone(),
            );
            report = RunReport::from_terminal(&terminal);
        }
    }
    lifecycle.finish()?;
    report.ok_or_else(|| InvariantViolation::MissingTerminal.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CheckSet, Endpoint, ExecutionSettings, SchemaHandle, Status};
    use crate::events::EventKind;
    use crate::emitter::channel;
    use crate::consumer::dispatch;

    async fn recorded_run() -> EventRecorder {
        let (mut emitter, stream) = channel(SchemaHandle::new("openapi.json"), 16);
        let mut recorder = EventRecorder::new(emitter.run_id());
        let a = Endpoint::new("GET", "/a");
        let b = Endpoint::new("POST", "/b");

        emitter
            .initialized(CheckSet::new(["not_a_server_error"]), ExecutionSettings::default())
            .await
            .expect("init");
        emitter.before_execution(&a).await.expect("before a");
        emitter
            .after_execution(&a, Status::Success, vec![])
            .await
            .expect("after a");
        emitter.before_execution(&b).await.expect("before b");
        emitter
            .after_execution(&b, Status::Failure, vec!["expected 201, got 400".into()])
            .await
            .expect("after b");
        emitter.finished().await.expect("finish");

        dispatch(stream, &mut [&mut recorder]).await.expect("dispatch");
        recorder
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_contiguous() {
        let recorder = recorded_run().await;
        let sequences: Vec<u64> = recorder.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5]);
        assert!(recorder
            .records()
            .iter()
            .all(|r| r.run_id == recorder.run_id()));
    }

    #[tokio::test]
    async fn test_ndjson_roundtrip_replays() {
        let recorder = recorded_run().await;
        let mut buf = Vec::new();
        recorder.write_ndjson(&mut buf).expect("write");
        assert_eq!(buf.iter().filter(|b| **b == b'\n').count(), 6);

        let records = read_ndjson(buf.as_slice()).expect("read");
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].event.name(), "initialized");

        let report = replay(&records).expect("replay");
        assert_eq!(report.status, Status::Failure);
        assert_eq!(report.total(), 2);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_snapshots_reflect_emission_order() {
        let recorder = recorded_run().await;
        let lens: Vec<usize> = recorder
            .records()
            .iter()
            .map(|r| r.event.results.len())
            .collect();
        // initialized, before a, after a, before b, after b, finished
        assert_eq!(lens, vec![0, 0, 1, 1, 2, 2]);
        assert!(recorder.records()[0].event.results.is_empty());
        assert_eq!(
            recorder.records()[3].event.results.snapshot().open_endpoint(),
            Some(&Endpoint::new("POST", "/b"))
        );
    }

    fn stale_log(kinds: Vec<EventKind>) -> Vec<EventRecord> {
        kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| EventRecord {
                sequence: i as u64,
                run_id: Uuid::nil(),
                recorded_at: Utc::now(),
                event: ExecutionEvent::new(
                    SchemaHandle::new("openapi.json"),
                    ResultsView::new(),
                    kind,
                ),
            })
            .collect()
    }

    fn failing_run_kinds() -> Vec<EventKind> {
        let a = Endpoint::new("GET", "/a");
        vec![
            EventKind::initialized(CheckSet::new(["not_a_server_error"]), ExecutionSettings::default()),
            EventKind::BeforeExecution { endpoint: a.clone() },
            EventKind::AfterExecution {
                endpoint: a,
                status: Status::Failure,
                diagnostics: vec!["expected 200, got 500".to_string()],
            },
            EventKind::Finished { duration_ms: 3 },
        ]
    }

    #[test]
    fn test_replay_rejects_snapshot_that_disagrees_with_events() {
        let records = stale_log(failing_run_kinds());
        let err = replay(&records).expect_err("empty snapshot after a failure");
        assert!(matches!(
            err,
            crate::Error::Protocol(InvariantViolation::SnapshotMismatch { sequence: 2 })
        ));
    }

    #[test]
    fn test_recorder_rebuilds_results_from_events() {
        // Events carry an empty live handle; the recorder still tracks them.
        let mut recorder = EventRecorder::new(Uuid::nil());
        for record in stale_log(failing_run_kinds()) {
            recorder.record_event(&record.event).expect("record");
        }

        let report = replay(recorder.records()).expect("replay");
        assert_eq!(report.status, Status::Failure);
        assert_eq!(report.total(), 1);
        assert!(!report.passed());
        assert_eq!(
            report.problems[0].diagnostics,
            vec!["expected 200, got 500".to_string()]
        );
    }

    #[test]
    fn test_recorder_rejects_unopened_close() {
        let mut recorder = EventRecorder::new(Uuid::nil());
        let records = stale_log(failing_run_kinds());
        recorder.record_event(&records[0].event).expect("initialized");
        assert!(recorder.record_event(&records[2].event).is_err());
        assert_eq!(recorder.records().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_rejects_truncated_log() {
        let recorder = recorded_run().await;
        let records = recorder.into_records();
        let err = replay(&records[..3]).expect_err("no terminal");
        assert!(matches!(
            err,
            crate::Error::Protocol(crate::InvariantViolation::MissingTerminal)
        ));
    }
}
