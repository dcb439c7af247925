//! Service Test Harness binary
//!
//! Loads suite definitions (from a file or from flags), runs them serially or
//! in parallel, optionally writes a JSON report, and exits 0 only if every
//! suite succeeded.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;

use harness::config::service::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use harness::{
    RunMode, ServiceConfig, ShutdownController, SuiteOrchestrator, SuiteReport, TracingObserver, load_suites,
};
use shared::Component;
use shared::logging::{init_tracing, log_shutdown, log_startup};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Start services, wait for readiness, run tests, always tear down")]
struct Args {
    /// JSON file with an array of suite definitions
    #[arg(long, conflicts_with = "start_command")]
    config: Option<PathBuf>,

    /// Shell command that launches the service (single-suite mode)
    #[arg(long)]
    start_command: Option<String>,

    /// Test command to run against the service; repeatable
    #[arg(long = "test-script")]
    test_scripts: Vec<String>,

    /// Suite name in single-suite mode
    #[arg(long, default_value = "service")]
    name: String,

    /// Output substring that marks the service ready
    #[arg(long)]
    ready_pattern: Option<String>,

    /// HTTP health-check URL polled after the service started
    #[arg(long)]
    health_url: Option<String>,

    /// Readiness timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Per-test timeout in seconds
    #[arg(long)]
    test_timeout_secs: Option<u64>,

    /// Health-check polling interval in seconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    /// Run suites concurrently instead of one after another
    #[arg(long)]
    parallel: bool,

    /// Write the JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn suites(&self) -> anyhow::Result<Vec<ServiceConfig>> {
        if let Some(path) = &self.config {
            return load_suites(path).with_context(|| format!("loading suites from {}", path.display()));
        }

        let Some(command) = &self.start_command else {
            bail!("either --config or --start-command is required");
        };

        let mut builder = ServiceConfig::builder()
            .name(&self.name)
            .start_command(command)
            .timeout(Duration::from_secs(self.timeout_secs))
            .poll_interval(Duration::from_secs(self.poll_interval_secs));

        if let Some(pattern) = &self.ready_pattern {
            builder = builder.ready_pattern(pattern);
        }
        if let Some(url) = &self.health_url {
            builder = builder.health_check_url(url);
        }
        if let Some(secs) = self.test_timeout_secs {
            builder = builder.test_timeout(Duration::from_secs(secs));
        }
        for script in &self.test_scripts {
            builder = builder.script(script);
        }

        let config = builder.build();
        config.validate().context("invalid command-line suite")?;
        Ok(vec![config])
    }

    fn mode(&self) -> RunMode {
        if self.parallel { RunMode::Parallel } else { RunMode::Serial }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Make .env visible to spawned service and test commands
    let _ = dotenv::dotenv();

    let log_level = if args.verbose { Some("debug") } else { args.log_level.as_deref() };
    init_tracing(Component::Harness, log_level);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let suites = args.suites()?;
    let mode = args.mode();
    log_startup(Component::Harness, &format!("{} suite(s) in {} mode", suites.len(), mode));

    let shutdown = Arc::new(ShutdownController::new());
    let interrupt_listener = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let reason = wait_for_interrupt().await;
            log_shutdown(Component::Harness, reason);
            // Running suites observe the trigger and stop their services before returning
            shutdown.trigger();
        })
    };

    let orchestrator = SuiteOrchestrator::new(suites, mode, Arc::new(TracingObserver));
    let results = orchestrator.run(shutdown.subscribe()).await;
    interrupt_listener.abort();

    let report = SuiteReport::from_results(mode, results);
    report.log_summary();

    // Suite results decide the exit code even when the report cannot be saved
    if let Some(path) = &args.report {
        report.persist(path);
    }

    log_shutdown(Component::Harness, "run complete");
    Ok(report.all_succeeded())
}

async fn wait_for_interrupt() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "interrupted (Ctrl+C)",
                _ = sigterm.recv() => "terminated (SIGTERM)",
            },
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                "interrupted (Ctrl+C)"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "interrupted (Ctrl+C)"
    }
}
