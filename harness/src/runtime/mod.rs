//! Runtime Management
//!
//! Process supervision, output forwarding, readiness probing and test execution.

pub mod output;
pub mod probe;
pub mod process_tree;
pub mod runner;
pub mod supervisor;

// Re-export main types
pub use output::{LogBuffer, OutputForwarder, OutputLine, OutputStream, TracingObserver};
pub use probe::ReadinessProbe;
pub use process_tree::ProcessTree;
pub use runner::{TestOutcome, TestResults, TestRunner};
pub use supervisor::ProcessSupervisor;
