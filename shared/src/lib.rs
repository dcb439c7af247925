//! Shared types for the service test harness and the trace analyzer
//!
//! Contains only what both binaries need: tracing setup, the process
//! lifecycle state and the configuration error type.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
