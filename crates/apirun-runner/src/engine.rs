//! Sequential run engine.
//!
//! Drives one run: `initialized`, then for each endpoint a
//! `before_execution` / `after_execution` pair around the executor call,
//! then `finished`. A cancellation request stops the run with
//! `interrupted`, including while an endpoint is in flight.

use apirun_core::{
    channel, emit_endpoint_finished, run_span, Endpoint, EventEmitter, EventStream, ResultsView,
    SchemaHandle, Status, StatusCounts, METRICS,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::config::RunConfig;
use crate::error::{Result, RunnerError};
use crate::executor::{EndpointExecutor, Outcome};

/// Result of a complete or interrupted run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,

    /// The run's Result Set, read-only.
    pub results: ResultsView,

    /// Whether the run ended with `interrupted`.
    pub interrupted: bool,

    /// Wall time spent in the engine, in milliseconds.
    pub duration_ms: u64,

    /// Digest of the run configuration.
    pub config_digest: String,
}

impl RunOutcome {
    pub fn status(&self) -> Status {
        self.results.rollup()
    }

    pub fn counts(&self) -> StatusCounts {
        self.results.counts()
    }

    /// Completed and every endpoint succeeded.
    pub fn passed(&self) -> bool {
        !self.interrupted && self.status() == Status::Success
    }
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunTask {
    run_id: Uuid,
    handle: JoinHandle<Result<RunOutcome>>,
}

impl RunTask {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the run to end.
    ///
    /// The event stream is bounded: drain it before (or while) joining.
    pub async fn join(self) -> Result<RunOutcome> {
        self.handle
            .await
            .map_err(|e| RunnerError::Join(e.to_string()))?
    }
}

/// Executes endpoints one at a time and emits the run's events.
pub struct Engine {
    schema: SchemaHandle,
    endpoints: Vec<Endpoint>,
    executor: Arc<dyn EndpointExecutor>,
    config: RunConfig,
}

impl Engine {
    pub fn new(
        schema: SchemaHandle,
        endpoints: Vec<Endpoint>,
        executor: Arc<dyn EndpointExecutor>,
        config: RunConfig,
    ) -> Self {
        Self {
            schema,
            endpoints,
            executor,
            config,
        }
    }

    /// Reject configurations that cannot start a run.
    ///
    /// Runs before any event exists, so errors reach the caller directly.
    pub fn validate(&self) -> Result<()> {
        if self.config.checks.is_empty() {
            return Err(RunnerError::Config("no checks selected".to_string()));
        }
        if self.config.channel_capacity == 0 {
            return Err(RunnerError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint) {
                return Err(RunnerError::Config(format!(
                    "endpoint {} listed more than once",
                    endpoint
                )));
            }
        }
        Ok(())
    }

    /// Validate, then spawn the run on the current runtime.
    pub fn start(self, cancel: CancelSignal) -> Result<(EventStream, RunTask)> {
        self.validate()?;
        let (emitter, events) = channel(self.schema.clone(), self.config.channel_capacity);
        let run_id = emitter.run_id();
        let span = run_span(&run_id.to_string());
        let handle = tokio::spawn(self.run(emitter, cancel).instrument(span));
        Ok((events, RunTask { run_id, handle }))
    }

    /// Drive the run to its terminal event on the caller's task.
    pub async fn run(self, mut emitter: EventEmitter, mut cancel: CancelSignal) -> Result<RunOutcome> {
        self.validate()?;
        let start = Instant::now();
        let run_id = emitter.run_id();
        let config_digest = self.config.digest();

        emitter
            .initialized(self.config.checks.clone(), self.config.settings.clone())
            .await?;
        info!(
            run_id = %run_id,
            config_digest = %config_digest,
            endpoints = self.endpoints.len(),
            "starting run"
        );

        for endpoint in &self.endpoints {
            if cancel.is_cancelled() {
                info!(run_id = %run_id, "cancelled between endpoints");
                return self
                    .interrupt(emitter, start, config_digest)
                    .await;
            }

            emitter.before_execution(endpoint).await?;
            let endpoint_start = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(run_id = %run_id, endpoint = %endpoint, "cancelled while endpoint in flight");
                    return self.interrupt(emitter, start, config_digest).await;
                }
                result = self.executor.execute(
                    endpoint,
                    &self.config.checks,
                    &self.config.settings,
                ) => match result {
                    Ok(outcome) => outcome,
                    // The endpoint could not be tested; that is data, not a run failure.
                    Err(e) => Outcome::error(vec![format!("{:#}", e)]),
                },
            };

            let status = outcome.status;
            emit_endpoint_finished(
                &run_id.to_string(),
                endpoint,
                status,
                endpoint_start.elapsed().as_millis() as u64,
            );
            emitter
                .after_execution(endpoint, status, outcome.diagnostics)
                .await?;

            if self.config.fail_fast && status != Status::Success {
                info!(run_id = %run_id, endpoint = %endpoint, "fail-fast: stopping run");
                break;
            }
        }

        let results = emitter.finished().await?;
        METRICS.flush();
        Ok(RunOutcome {
            run_id,
            results,
            interrupted: false,
            duration_ms: start.elapsed().as_millis() as u64,
            config_digest,
        })
    }

    async fn interrupt(
        &self,
        emitter: EventEmitter,
        start: Instant,
        config_digest: String,
    ) -> Result<RunOutcome> {
        let run_id = emitter.run_id();
        let results = emitter.interrupted().await?;
        METRICS.flush();
        Ok(RunOutcome {
            run_id,
            results,
            interrupted: true,
            duration_ms: start.elapsed().as_millis() as u64,
            config_digest,
        })
    }
}
