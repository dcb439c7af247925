//! Sequential test execution against a running service
//!
//! Every test command runs through the shell to completion, one after the
//! other. A test that fails, cannot start, or exceeds the per-test timeout is
//! recorded and the runner moves on to the next one.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use serde::Serialize;
use serde::ser::SerializeMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use crate::config::TestCommands;
use crate::error::{HarnessError, HarnessResult};
use crate::runtime::process_tree::{self, ProcessTree};
use crate::runtime::supervisor::shell_command;
use crate::traits::ServiceSupervisor;
use shared::logging::log_error;
use shared::{service_debug, service_info, service_warn};

/// How long pipes may keep draining after the test process exited
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);
const REAP_WAIT: Duration = Duration::from_secs(2);

/// Exit code recorded for a test whose command could not be started
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// Exit code recorded for a timed-out test that reported a clean exit
pub const TIMEOUT_KILL_CODE: i32 = -(Signal::SIGKILL as i32);

/// Result of a single test command. `success` is always `exit_code == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    #[serde(rename = "returncode")]
    exit_code: i32,
    stdout: String,
    stderr: String,
    success: bool,
    timed_out: bool,
    duration_ms: u64,
}

impl TestOutcome {
    pub fn completed(exit_code: i32, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            success: exit_code == 0,
            timed_out: false,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// A test killed after exceeding its timeout, with whatever output it produced.
    /// A clean exit that raced the kill is still recorded as killed.
    pub fn timed_out(exit_code: i32, stdout: String, stderr: String, duration: Duration) -> Self {
        let exit_code = if exit_code == 0 { TIMEOUT_KILL_CODE } else { exit_code };
        Self {
            timed_out: true,
            ..Self::completed(exit_code, stdout, stderr, duration)
        }
    }

    /// A test whose command never started; the reason lands in stderr
    pub fn failed_to_start(reason: impl Into<String>) -> Self {
        Self::completed(SPAWN_FAILURE_CODE, String::new(), reason.into(), Duration::ZERO)
    }

    /// Exit code; negative values are the signal that terminated the test
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Ordered mapping of test name to outcome, serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestResults(Vec<(String, TestOutcome)>);

impl TestResults {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, outcome: TestOutcome) {
        self.0.push((name.into(), outcome));
    }

    /// Logical AND over every recorded test. An empty set passes.
    pub fn all_passed(&self) -> bool {
        self.0.iter().all(|(_, outcome)| outcome.success())
    }

    pub fn get(&self, name: &str) -> Option<&TestOutcome> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TestOutcome)> {
        self.0.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TestResults {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, outcome) in &self.0 {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

/// Runs a suite's test commands one at a time
#[derive(Debug, Clone, Default)]
pub struct TestRunner {
    test_timeout: Option<Duration>,
}

impl TestRunner {
    pub fn new(test_timeout: Option<Duration>) -> Self {
        Self { test_timeout }
    }

    /// Run every test in order, appending each outcome to `results` as it completes.
    ///
    /// Fails with `ServiceNotRunning` before running anything if the service
    /// already exited. Individual test failures never abort the run.
    pub async fn run(
        &self,
        service: &str,
        supervisor: &mut dyn ServiceSupervisor,
        tests: &TestCommands,
        results: &mut TestResults,
    ) -> HarnessResult<()> {
        if !supervisor.is_running() {
            service_warn!(service, "⚠️ Service not running, no tests can be executed");
            return Err(HarnessError::ServiceNotRunning {
                service: service.to_string(),
            });
        }

        for test in tests.iter() {
            service_info!(service, "==== Running test: {} ====", test.name);
            let outcome = self.run_one(service, &test.name, &test.command).await;

            if !outcome.stdout().is_empty() {
                service_debug!(service, "Test stdout:\n{}", outcome.stdout());
            }
            if !outcome.stderr().is_empty() {
                service_debug!(service, "Test stderr:\n{}", outcome.stderr());
            }

            if outcome.success() {
                service_info!(service, "✅ Test {} passed ({} ms)", test.name, outcome.duration_ms());
            } else if outcome.is_timed_out() {
                service_warn!(service, "⏰ Test {} timed out after {} ms", test.name, outcome.duration_ms());
            } else {
                service_warn!(service, "❌ Test {} failed with exit code {}", test.name, outcome.exit_code());
            }

            results.push(test.name.clone(), outcome);
        }

        Ok(())
    }

    async fn run_one(&self, service: &str, name: &str, command: &str) -> TestOutcome {
        let started = Instant::now();

        let mut cmd = shell_command(command);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let error = HarnessError::TestExecution {
                    test: name.to_string(),
                    message: e.to_string(),
                };
                log_error(service, "Test spawn", &error);
                return TestOutcome::failed_to_start(error.to_string());
            }
        };

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let readers: Vec<JoinHandle<()>> = [
            spawn_capture(child.stdout.take(), stdout_buf.clone()),
            spawn_capture(child.stderr.take(), stderr_buf.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let (status, timed_out) = match self.test_timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => (status.ok(), false),
                Err(_) => {
                    if let Some(pid) = child.id() {
                        for descendant in ProcessTree::new().descendants(pid).await {
                            let _ = process_tree::send_signal(descendant, Signal::SIGKILL);
                        }
                        let _ = process_tree::signal_group(pid, Signal::SIGKILL);
                    }
                    let _ = child.start_kill();
                    let status = tokio::time::timeout(REAP_WAIT, child.wait()).await.ok().and_then(|r| r.ok());
                    (status, true)
                }
            },
            None => (child.wait().await.ok(), false),
        };

        for mut reader in readers {
            if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut reader).await.is_err() {
                reader.abort();
            }
        }

        let exit_code = status.map(exit_code_of).unwrap_or(SPAWN_FAILURE_CODE);
        let stdout = drain(&stdout_buf);
        let stderr = drain(&stderr_buf);
        let duration = started.elapsed();

        if timed_out {
            TestOutcome::timed_out(exit_code, stdout, stderr, duration)
        } else {
            TestOutcome::completed(exit_code, stdout, stderr, duration)
        }
    }
}

/// Exit code, or the negated signal number for a signal-terminated process
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(SPAWN_FAILURE_CODE)
}

fn spawn_capture<R>(reader: Option<R>, sink: Arc<Mutex<Vec<u8>>>) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = reader?;
    Some(tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(&chunk[..n]),
            }
        }
    }))
}

fn drain(buffer: &Mutex<Vec<u8>>) -> String {
    let bytes = buffer.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&bytes).into_owned()
}
