//! Suite lifecycle and multi-suite orchestration
//!
//! A suite walks `Idle -> Starting -> WaitingReady -> Testing -> Stopping -> Done`.
//! Whatever happens in the first three phases (failure, panic, interrupt),
//! `Stopping` runs exactly once before `run()` returns.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{ProcessSupervisor, ReadinessProbe, TestResults, TestRunner};
use crate::suite::shutdown::ShutdownSignal;
use crate::traits::{OutputObserver, ServiceSupervisor};
use shared::logging::{log_error, log_success};
use shared::{service_error, service_info};

/// Output lines echoed into the log when a service fails to start
const FAILURE_OUTPUT_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteState {
    Idle,
    Starting,
    WaitingReady,
    Testing,
    Stopping,
    Done,
}

/// Outcome of one suite. `success` requires a clean start and every test passing.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub test_results: TestResults,
}

impl SuiteResult {
    /// A suite that never produced test results
    pub fn failed(name: impl Into<String>, error: &HarnessError) -> Self {
        Self {
            name: name.into(),
            success: false,
            error: Some(error.to_string()),
            duration_ms: 0,
            test_results: TestResults::new(),
        }
    }
}

/// One service configuration bound to the supervisor that runs it
pub struct Suite<S: ServiceSupervisor> {
    config: ServiceConfig,
    supervisor: S,
    probe: ReadinessProbe,
    runner: TestRunner,
    history: Vec<SuiteState>,
}

impl<S: ServiceSupervisor> Suite<S> {
    pub fn new(config: ServiceConfig, supervisor: S) -> Self {
        let runner = TestRunner::new(config.test_timeout());
        Self {
            config,
            supervisor,
            probe: ReadinessProbe::new(),
            runner,
            history: vec![SuiteState::Idle],
        }
    }

    /// Replace the health-check probe (fluent API)
    pub fn with_probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> SuiteState {
        self.history.last().copied().unwrap_or(SuiteState::Idle)
    }

    /// Every state visited so far, in order
    pub fn history(&self) -> &[SuiteState] {
        &self.history
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    fn transition(&mut self, next: SuiteState) {
        tracing::debug!(suite = %self.config.name, "📍 {:?} -> {:?}", self.state(), next);
        self.history.push(next);
    }

    /// Drive the full lifecycle. Never panics and never leaves the service running.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> SuiteResult {
        let started = Instant::now();
        let name = self.config.name.clone();
        let mut results = TestResults::new();

        service_info!(name, "🧪 Starting suite with {} test(s)", self.config.test_commands.len());

        let outcome = {
            let lifecycle = AssertUnwindSafe(self.lifecycle(&mut results)).catch_unwind();
            tokio::select! {
                outcome = lifecycle => match outcome {
                    Ok(outcome) => outcome,
                    Err(panic) => Err(HarnessError::Panicked { message: panic_message(&*panic) }),
                },
                _ = shutdown.wait() => Err(HarnessError::Interrupted),
            }
        };

        self.transition(SuiteState::Stopping);
        if let Err(e) = self.supervisor.stop().await {
            log_error(&name, "Teardown", &HarnessError::from(e));
        }
        self.transition(SuiteState::Done);

        let success = outcome.is_ok() && results.all_passed();
        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                log_error(&name, "Suite", &e);
                Some(e.to_string())
            }
        };

        if success {
            log_success(&name, "Suite passed");
        } else if error.is_none() {
            service_error!(name, "❌ Suite finished with failing tests");
        }

        SuiteResult {
            name,
            success,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
            test_results: results,
        }
    }

    async fn lifecycle(&mut self, results: &mut TestResults) -> HarnessResult<()> {
        let timeout = self.config.timeout();

        self.transition(SuiteState::Starting);
        let started = self
            .supervisor
            .start(&self.config.start_command, self.config.ready_pattern.clone(), timeout)
            .await;
        if let Err(e) = started {
            let tail = self.supervisor.recent_output(FAILURE_OUTPUT_LINES);
            if !tail.is_empty() {
                service_error!(self.config.name, "Last service output:\n{}", tail.join("\n"));
            }
            return Err(e.into());
        }

        self.transition(SuiteState::WaitingReady);
        let url = self.config.health_check_url.as_deref();
        if !self.probe.poll(url, timeout, self.config.poll_interval()).await {
            return Err(HarnessError::ReadinessTimeout {
                url: url.unwrap_or_default().to_string(),
                timeout,
            });
        }

        self.transition(SuiteState::Testing);
        self.runner
            .run(&self.config.name, &mut self.supervisor, &self.config.test_commands, results)
            .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Whether suites run one after another or all at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Serial,
    Parallel,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Serial => write!(f, "serial"),
            RunMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Runs every configured suite against its own `ProcessSupervisor`
pub struct SuiteOrchestrator {
    configs: Vec<ServiceConfig>,
    mode: RunMode,
    observer: Arc<dyn OutputObserver>,
}

impl SuiteOrchestrator {
    pub fn new(configs: Vec<ServiceConfig>, mode: RunMode, observer: Arc<dyn OutputObserver>) -> Self {
        Self { configs, mode, observer }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    fn suite_for(&self, config: ServiceConfig) -> Suite<ProcessSupervisor> {
        let supervisor = ProcessSupervisor::new(config.name.clone(), self.observer.clone())
            .with_startup_delay(config.startup_delay());
        Suite::new(config, supervisor)
    }

    /// Run every suite; results come back in configuration order
    pub async fn run(&self, shutdown: ShutdownSignal) -> Vec<SuiteResult> {
        info!("🎬 Running {} suite(s) in {} mode", self.configs.len(), self.mode);

        match self.mode {
            RunMode::Serial => self.run_serial(shutdown).await,
            RunMode::Parallel => self.run_parallel(shutdown).await,
        }
    }

    async fn run_serial(&self, shutdown: ShutdownSignal) -> Vec<SuiteResult> {
        let mut results = Vec::with_capacity(self.configs.len());

        for config in &self.configs {
            if shutdown.is_triggered() {
                warn!("⏭️ Skipping suite {} after shutdown request", config.name);
                results.push(SuiteResult::failed(config.name.clone(), &HarnessError::Interrupted));
                continue;
            }

            let mut suite = self.suite_for(config.clone());
            results.push(suite.run(shutdown.clone()).await);
        }

        results
    }

    async fn run_parallel(&self, shutdown: ShutdownSignal) -> Vec<SuiteResult> {
        let collected: Arc<Mutex<Vec<(usize, SuiteResult)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(self.configs.len());

        for (index, config) in self.configs.iter().enumerate() {
            let name = config.name.clone();
            let mut suite = self.suite_for(config.clone());
            let signal = shutdown.clone();
            let sink = collected.clone();

            let handle = tokio::spawn(async move {
                let result = suite.run(signal).await;
                sink.lock().await.push((index, result));
            });
            handles.push((index, name, handle));
        }

        for (index, name, handle) in handles {
            if let Err(e) = handle.await {
                let error = HarnessError::Panicked { message: e.to_string() };
                log_error(&name, "Suite task", &error);
                collected.lock().await.push((index, SuiteResult::failed(name, &error)));
            }
        }

        let mut results = std::mem::take(&mut *collected.lock().await);
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
