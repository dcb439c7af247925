//! Suite orchestration
//!
//! Per-suite lifecycle, multi-suite scheduling, shutdown broadcast and the run report.

pub mod orchestrator;
pub mod report;
pub mod shutdown;

pub use orchestrator::{RunMode, Suite, SuiteOrchestrator, SuiteResult, SuiteState};
pub use report::SuiteReport;
pub use shutdown::{ShutdownController, ShutdownSignal};
