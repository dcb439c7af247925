//! Service process supervision
//!
//! Owns exactly one service launched from a shell command: spawns it,
//! forwards its output, detects readiness, and tears down its whole process
//! group on stop or drop.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep};

use crate::error::{StartError, StopError};
use crate::runtime::output::{DEFAULT_LOG_CAPACITY, LogBuffer, OutputForwarder};
use crate::runtime::process_tree::{self, ProcessTree};
use crate::traits::{OutputObserver, Ready, ServiceSupervisor};
use shared::{ProcessState, service_debug, service_error, service_info, service_warn};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);
const EXIT_CODE_WAIT: Duration = Duration::from_millis(500);

/// Build a command that runs `command` through the platform shell
pub fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Ownership of one spawned service process
struct ProcessHandle {
    child: Child,
    pid: u32,
    output: OutputForwarder,
}

pub struct ProcessSupervisor {
    name: String,
    observer: Arc<dyn OutputObserver>,
    buffer: LogBuffer,
    handle: Option<ProcessHandle>,
    state: ProcessState,
    startup_delay: Duration,
    grace_period: Duration,
}

impl ProcessSupervisor {
    pub fn new<S: Into<String>>(name: S, observer: Arc<dyn OutputObserver>) -> Self {
        Self {
            name: name.into(),
            observer,
            buffer: LogBuffer::new(DEFAULT_LOG_CAPACITY),
            handle: None,
            state: ProcessState::Starting,
            startup_delay: DEFAULT_STARTUP_DELAY,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Fallback wait used when no ready pattern is configured (fluent API)
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Time allowed for voluntary exit after SIGTERM (fluent API)
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Maximum number of output lines retained (fluent API)
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.buffer = LogBuffer::new(capacity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// PID of the root (shell) process, while it is owned
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(|h| h.pid)
    }

    fn advance(&mut self, next: ProcessState) {
        if self.state.can_advance_to(next) {
            service_debug!(self.name, "🔁 {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Exit code of the root process if it exits within `wait`
    async fn exit_code_within(&mut self, wait: Duration) -> Option<i32> {
        let handle = self.handle.as_mut()?;
        match tokio::time::timeout(wait, handle.child.wait()).await {
            Ok(Ok(status)) => status.code(),
            _ => None,
        }
    }

    async fn wait_for_ready(
        &mut self,
        ready_rx: Option<oneshot::Receiver<String>>,
        ready_pattern: Option<String>,
        timeout: Duration,
    ) -> Result<Ready, StartError> {
        match (ready_pattern, ready_rx) {
            (Some(pattern), Some(rx)) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(line)) => Ok(Ready::PatternMatched { line }),
                Ok(Err(_)) => {
                    let code = self.exit_code_within(EXIT_CODE_WAIT).await;
                    Err(StartError::Exited { code })
                }
                Err(_) => Err(StartError::Timeout { pattern, timeout }),
            },
            _ => {
                sleep(self.startup_delay.min(timeout)).await;
                if self.root_alive() {
                    Ok(Ready::DelayElapsed)
                } else {
                    let code = self.exit_code_within(EXIT_CODE_WAIT).await;
                    Err(StartError::Exited { code })
                }
            }
        }
    }

    fn root_alive(&mut self) -> bool {
        match self.handle.as_mut() {
            Some(handle) => matches!(handle.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Terminate the service's process group and any descendants that left it,
    /// escalating to SIGKILL after the grace period. Runs whether or not the
    /// root shell is still alive, since backgrounded children outlive it.
    async fn terminate_tree(&mut self, handle: &mut ProcessHandle) -> Result<(), StopError> {
        let mut tree = ProcessTree::new();
        let pgid = handle.pid;
        let descendants = tree.descendants(handle.pid).await;
        let mut first_error: Option<StopError> = None;

        service_info!(
            self.name,
            "🛑 Stopping service group {} and {} descendant processes",
            pgid,
            descendants.len()
        );

        if let Err(e) = process_tree::signal_group(pgid, Signal::SIGTERM) {
            service_warn!(self.name, "⚠️ {}", e);
            first_error.get_or_insert(e);
        }
        for &pid in &descendants {
            if let Err(e) = process_tree::send_signal(pid, Signal::SIGTERM) {
                service_warn!(self.name, "⚠️ {}", e);
                first_error.get_or_insert(e);
            }
        }

        let deadline = Instant::now() + self.grace_period;
        if tokio::time::timeout(self.grace_period, handle.child.wait()).await.is_err() {
            service_warn!(self.name, "🔨 Service did not exit within {:?}, force killing", self.grace_period);
            let _ = handle.child.start_kill();
        }

        // Leftovers get whatever is left of the grace period
        let mut tracked = descendants;
        for pid in tree.group_members(pgid).await {
            if pid != handle.pid && !tracked.contains(&pid) {
                tracked.push(pid);
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tree.wait_for_exit(&tracked, remaining).await {
            Ok(alive) => {
                for pid in alive {
                    service_warn!(self.name, "🔨 Force killing leftover process {}", pid);
                    if let Err(e) = process_tree::send_signal(pid, Signal::SIGKILL) {
                        first_error.get_or_insert(e);
                    }
                }
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        // Anything that joined the group after the scans
        if let Err(e) = process_tree::signal_group(pgid, Signal::SIGKILL) {
            first_error.get_or_insert(e);
        }

        let _ = tokio::time::timeout(self.grace_period, handle.child.wait()).await;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Synchronous last-resort kill of the whole group and its descendants
    fn kill_tree_now(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let descendants = process_tree::descendants_blocking(handle.pid);
            for &pid in &descendants {
                let _ = process_tree::send_signal(pid, Signal::SIGKILL);
            }
            let group_alive = matches!(process_tree::signal_group(handle.pid, Signal::SIGKILL), Ok(true));
            let _ = handle.child.start_kill();
            if group_alive || !descendants.is_empty() {
                service_warn!(self.name, "🚨 Emergency cleanup: force killed service group {}", handle.pid);
            }
            handle.output.abort();
        }
    }
}

#[async_trait::async_trait]
impl ServiceSupervisor for ProcessSupervisor {
    async fn start(
        &mut self,
        command: &str,
        ready_pattern: Option<String>,
        timeout: Duration,
    ) -> Result<Ready, StartError> {
        if self.handle.is_some() || self.state != ProcessState::Starting {
            return Err(StartError::AlreadyStarted);
        }

        service_info!(self.name, "🚀 Launching service: {}", command);

        let mut cmd = shell_command(command);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.advance(ProcessState::Failed);
                service_error!(self.name, "❌ Failed to spawn service: {}", source);
                return Err(StartError::SpawnFailed {
                    command: command.to_string(),
                    source,
                });
            }
        };

        let pid = child.id().unwrap_or(0);
        let (output, ready_rx) = OutputForwarder::spawn(
            self.name.clone(),
            child.stdout.take(),
            child.stderr.take(),
            ready_pattern.clone(),
            self.buffer.clone(),
            self.observer.clone(),
        );
        self.handle = Some(ProcessHandle { child, pid, output });

        service_debug!(self.name, "Spawned service shell (PID: {})", pid);

        match self.wait_for_ready(ready_rx, ready_pattern, timeout).await {
            Ok(ready) => {
                self.advance(ProcessState::Running);
                match &ready {
                    Ready::PatternMatched { line } => {
                        service_info!(self.name, "✅ Service ready (matched: {})", line);
                    }
                    Ready::DelayElapsed => {
                        service_info!(
                            self.name,
                            "✅ Service still running after {:?} startup delay",
                            self.startup_delay
                        );
                    }
                }
                Ok(ready)
            }
            Err(e) => {
                self.advance(ProcessState::Failed);
                service_error!(self.name, "❌ {}", e);
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<(), StopError> {
        let Some(mut handle) = self.handle.take() else {
            service_debug!(self.name, "Service not running or already stopped");
            self.advance(ProcessState::Stopped);
            return Ok(());
        };

        if matches!(handle.child.try_wait(), Ok(Some(_))) {
            service_info!(self.name, "Service shell already exited, sweeping its process group");
        }
        let result = self.terminate_tree(&mut handle).await;

        handle.output.shutdown(OUTPUT_DRAIN_GRACE).await;
        self.advance(ProcessState::Stopped);

        match &result {
            Ok(()) => {
                service_info!(self.name, "✅ Service stopped");
            }
            Err(e) => {
                service_warn!(self.name, "⚠️ Service stopped with teardown errors: {}", e);
            }
        }
        result
    }

    fn is_running(&mut self) -> bool {
        let alive = self.root_alive();
        if !alive && self.state == ProcessState::Running {
            service_warn!(self.name, "⚠️ Service exited unexpectedly");
            self.advance(ProcessState::Failed);
        }
        alive
    }

    fn state(&self) -> ProcessState {
        self.state
    }

    fn recent_output(&self, count: usize) -> Vec<String> {
        self.buffer.tail(count)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.kill_tree_now();
    }
}
