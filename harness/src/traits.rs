//! Trait definitions with mockall annotations for testing
//!
//! The suite lifecycle talks to the supervised service and to the output
//! sink only through these seams, so tests can substitute mocks and count
//! exactly how often teardown runs.

use std::time::Duration;

use crate::error::{StartError, StopError};
use crate::runtime::output::OutputLine;
use shared::ProcessState;

/// How a service was judged ready by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ready {
    /// The ready pattern appeared in this output line
    PatternMatched { line: String },
    /// No pattern configured; the fallback startup delay elapsed
    DelayElapsed,
}

/// Receives every line a supervised service writes.
///
/// Injected into the supervisor instead of writing to a global logger.
#[mockall::automock]
pub trait OutputObserver: Send + Sync {
    fn on_line(&self, service: &str, line: &OutputLine);
}

/// Lifecycle control of exactly one external service process
#[mockall::automock]
#[async_trait::async_trait]
pub trait ServiceSupervisor: Send {
    /// Spawn `command` through the platform shell and wait until it is ready
    ///
    /// # Returns
    /// `Ready` once `ready_pattern` was seen (or the startup delay elapsed when
    /// no pattern is configured), otherwise the reason the start failed
    async fn start(
        &mut self,
        command: &str,
        ready_pattern: Option<String>,
        timeout: Duration,
    ) -> Result<Ready, StartError>;

    /// Terminate the full process tree. Idempotent.
    async fn stop(&mut self) -> Result<(), StopError>;

    /// Whether the root process is still alive
    fn is_running(&mut self) -> bool;

    /// Current lifecycle state
    fn state(&self) -> ProcessState;

    /// The last `count` lines of captured output, oldest first
    fn recent_output(&self, count: usize) -> Vec<String>;
}
