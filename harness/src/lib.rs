//! Service Test Harness
//!
//! Brings up an external service from a shell command, waits until it is
//! ready (output pattern and/or HTTP health check), runs a set of named test
//! commands against it, and always tears the whole process tree down again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harness::*;
//!
//! # async fn demo() {
//! let config = ServiceConfig::builder()
//!     .name("api")
//!     .start_command("./serve.sh")
//!     .ready_pattern("listening on")
//!     .health_check_url("http://127.0.0.1:8080/health")
//!     .test("smoke", "./smoke.sh")
//!     .build();
//!
//! let orchestrator = SuiteOrchestrator::new(vec![config], RunMode::Serial, Arc::new(TracingObserver));
//! let results = orchestrator.run(ShutdownSignal::never()).await;
//! let report = SuiteReport::from_results(orchestrator.mode(), results);
//! assert!(report.all_succeeded());
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod runtime;
pub mod suite;
pub mod traits;

// Main interfaces - re-exported at crate root for convenience
pub use config::{ServiceConfig, ServiceConfigBuilder, TestCommands, load_suites};
pub use error::{HarnessError, HarnessResult, StartError, StopError};
pub use runtime::{ProcessSupervisor, ReadinessProbe, TestOutcome, TestResults, TestRunner, TracingObserver};
pub use suite::{RunMode, ShutdownController, ShutdownSignal, Suite, SuiteOrchestrator, SuiteReport, SuiteResult, SuiteState};
pub use traits::{OutputObserver, Ready, ServiceSupervisor};
