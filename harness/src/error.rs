//! Harness error types

use shared::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Why a supervised service could not be brought to the ready state
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Failed to spawn service command `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ready pattern '{pattern}' not seen within {timeout:?}")]
    Timeout { pattern: String, timeout: Duration },

    #[error("Service exited before becoming ready (exit code: {code:?})")]
    Exited { code: Option<i32> },

    #[error("Service is already started")]
    AlreadyStarted,
}

/// Process-tree teardown failures. Always non-fatal to callers.
#[derive(Error, Debug)]
pub enum StopError {
    #[error("Process {pid} could not be inspected or signalled: {reason}")]
    ProcessGone { pid: u32, reason: String },
}

/// Suite-level error taxonomy. Captured into results, never raised past a suite.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Service could not be started: {0}")]
    Spawn(#[from] StartError),

    #[error("Health check {url} not satisfied within {timeout:?}")]
    ReadinessTimeout { url: String, timeout: Duration },

    #[error("Service {service} is not running")]
    ServiceNotRunning { service: String },

    #[error("Test {test} could not run: {message}")]
    TestExecution { test: String, message: String },

    #[error("Teardown failed: {0}")]
    Teardown(#[from] StopError),

    #[error("Interrupted by shutdown signal")]
    Interrupted,

    #[error("Suite lifecycle panicked: {message}")]
    Panicked { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
