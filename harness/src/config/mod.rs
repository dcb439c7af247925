//! Configuration Management
//!
//! This module provides suite configuration structures, the builder and the
//! suite file loader.

pub mod builder;
pub mod loader;
pub mod service;

// Re-export main types
pub use builder::ServiceConfigBuilder;
pub use loader::{load_suites, parse_suites};
pub use service::{ServiceConfig, TestCommand, TestCommands};
