//! Endpoint execution boundary.
//!
//! Generating inputs, sending requests and running checks happen behind
//! [`EndpointExecutor`]. The engine only sees the resulting [`Outcome`].

use apirun_core::{CheckSet, Endpoint, ExecutionSettings, Status};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of testing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,

    /// Captured output, in order. May be empty.
    pub diagnostics: Vec<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            diagnostics: Vec::new(),
        }
    }

    pub fn failure(diagnostics: Vec<String>) -> Self {
        Self {
            status: Status::Failure,
            diagnostics,
        }
    }

    pub fn error(diagnostics: Vec<String>) -> Self {
        Self {
            status: Status::Error,
            diagnostics,
        }
    }
}

/// Tests one endpoint against the configured checks.
///
/// Returning `Err` means execution could not complete; the engine records
/// it as `Status::Error` and moves on to the next endpoint.
#[async_trait]
pub trait EndpointExecutor: Send + Sync {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        checks: &CheckSet,
        settings: &ExecutionSettings,
    ) -> anyhow::Result<Outcome>;
}

/// Runs an external command once per endpoint.
///
/// The command sees the endpoint and configuration through environment
/// variables:
/// - `APIRUN_METHOD`, `APIRUN_PATH`
/// - `APIRUN_CHECKS` (comma separated)
/// - `APIRUN_MAX_EXAMPLES`
/// - `APIRUN_DEADLINE_MS`, `APIRUN_SEED` (when set)
///
/// Exit code 0 is success, 1 is failure, anything else is error. Non-empty
/// stdout then stderr lines become diagnostics.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl CommandExecutor {
    /// `command[0]` is the executable. A timeout of 0 disables it.
    pub fn new(command: Vec<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let mut parts = command.into_iter();
        let program = match parts.next() {
            Some(program) if !program.is_empty() => program,
            _ => anyhow::bail!("executor command is empty"),
        };
        Ok(Self {
            program,
            args: parts.collect(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl EndpointExecutor for CommandExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        checks: &CheckSet,
        settings: &ExecutionSettings,
    ) -> anyhow::Result<Outcome> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("APIRUN_METHOD", &endpoint.method)
            .env("APIRUN_PATH", &endpoint.path)
            .env("APIRUN_CHECKS", checks.iter().collect::<Vec<_>>().join(","))
            .env("APIRUN_MAX_EXAMPLES", settings.max_examples.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(deadline_ms) = settings.deadline_ms {
            command.env("APIRUN_DEADLINE_MS", deadline_ms.to_string());
        }
        if let Some(seed) = settings.seed {
            command.env("APIRUN_SEED", seed.to_string());
        }

        let child = command.spawn()?;
        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} timed out after {} seconds",
                    endpoint,
                    self.timeout_secs
                )
            })??
        } else {
            child.wait_with_output().await?
        };

        let diagnostics: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let status = match output.status.code() {
            Some(0) => Status::Success,
            Some(1) => Status::Failure,
            _ => Status::Error,
        };

        Ok(Outcome {
            status,
            diagnostics,
        })
    }
}
