//! apirun - API test run driver
//!
//! ## Commands
//!
//! - `run`: test endpoints through an external command, print progress and
//!   optionally record the event stream as NDJSON
//! - `summarize`: validate a recorded event log and print its verdict

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use apirun_core::{
    dispatch, read_ndjson, replay, CheckSet, Endpoint, EventRecorder, ExecutionSettings,
    ProgressReporter, RunReport, SchemaHandle,
};
use apirun_runner::{cancellation, CommandExecutor, Engine, RunConfig};

#[derive(Parser)]
#[command(name = "apirun")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive API test runs and inspect their event logs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test endpoints, one at a time, with an external command
    Run(RunArgs),

    /// Validate a recorded event log and summarize the run
    Summarize {
        /// NDJSON event log written by `run --record`
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Schema location (path or URL), reported to consumers
    #[arg(short, long)]
    schema: String,

    /// Endpoint to test, as "METHOD /path" (repeatable, tested in order)
    #[arg(short, long = "endpoint", required = true)]
    endpoints: Vec<String>,

    /// Check to run against every response (repeatable)
    #[arg(short, long = "check")]
    checks: Vec<String>,

    /// Maximum generated examples per endpoint
    #[arg(long, default_value = "100")]
    max_examples: u32,

    /// Per-example deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Seed for reproducible generation
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after the first endpoint that does not succeed
    #[arg(long)]
    fail_fast: bool,

    /// Per-endpoint timeout in seconds (0 disables)
    #[arg(long, default_value = "300")]
    timeout: u64,

    /// Write the event stream to this NDJSON file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Executor command, run once per endpoint
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

impl RunArgs {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::default()
            .with_settings(ExecutionSettings {
                max_examples: self.max_examples,
                deadline_ms: self.deadline_ms,
                seed: self.seed,
            })
            .with_fail_fast(self.fail_fast);
        if !self.checks.is_empty() {
            config = config.with_checks(CheckSet::new(self.checks.iter().cloned()));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    apirun_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => {
            let report = cmd_run(&args).await?;
            finish(&report)
        }
        Commands::Summarize { path } => {
            let report = cmd_summarize(&path)?;
            print_report(&report);
            finish(&report)
        }
    }
}

fn finish(report: &RunReport) -> Result<()> {
    if report.passed() {
        Ok(())
    } else if report.interrupted {
        anyhow::bail!("run was interrupted")
    } else {
        anyhow::bail!("run finished with status {}", report.status)
    }
}

fn parse_endpoints(raw: &[String]) -> Result<Vec<Endpoint>> {
    raw.iter()
        .map(|s| {
            s.parse::<Endpoint>()
                .with_context(|| format!("invalid endpoint {:?}", s))
        })
        .collect()
}

async fn cmd_run(args: &RunArgs) -> Result<RunReport> {
    let endpoints = parse_endpoints(&args.endpoints)?;
    let executor = CommandExecutor::new(args.command.clone(), args.timeout)?;
    let engine = Engine::new(
        SchemaHandle::new(args.schema.clone()),
        endpoints,
        Arc::new(executor),
        args.config(),
    );

    let (cancel, signal) = cancellation();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping run");
            cancel.cancel();
        }
    });

    let (events, task) = engine.start(signal).context("failed to start run")?;
    let run_id = task.run_id();

    let mut progress = ProgressReporter::new(std::io::stdout());
    let mut recorder = EventRecorder::new(run_id);
    let dispatched = dispatch(events, &mut [&mut progress, &mut recorder]).await;
    let outcome = task.join().await.context("run failed")?;
    ctrl_c.abort();
    let terminal = dispatched.context("event stream broke the run lifecycle")?;

    info!(
        run_id = %run_id,
        config_digest = %outcome.config_digest,
        duration_ms = outcome.duration_ms,
        "run ended"
    );

    if let Some(path) = &args.record {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        recorder
            .write_ndjson(BufWriter::new(file))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Recorded {} events to {}", recorder.records().len(), path.display());
    }

    RunReport::from_terminal(&terminal).context("run ended without a terminal event")
}

fn cmd_summarize(path: &Path) -> Result<RunReport> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let records = read_ndjson(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    replay(&records).context("event log is not a valid run")
}

fn print_report(report: &RunReport) {
    println!("Status: {}", report.status);
    println!("{}", report.message());
    if let Some(endpoint) = &report.incomplete {
        println!("Incomplete: {}", endpoint);
    }
    if !report.problems.is_empty() {
        println!("Problems:");
        for entry in &report.problems {
            println!("  - {} ({})", entry.endpoint, entry.status);
            for line in &entry.diagnostics {
                println!("      {}", line);
            }
        }
    }
}
