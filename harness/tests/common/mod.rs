//! Common test utilities and infrastructure
//!
//! Shared fixtures, fake supervisors and a local health endpoint used across
//! the harness test suites.
#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{FakeBehaviour, FakeSupervisor, HealthServer, RecordingObserver, TestHelpers};
