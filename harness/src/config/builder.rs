//! Service Configuration Builder
//!
//! Provides a flexible builder pattern for constructing suite configurations

use super::ServiceConfig;
use super::service::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STARTUP_DELAY_SECS, DEFAULT_TIMEOUT_SECS, TestCommands};
use std::time::Duration;

pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServiceConfig {
                name: "service".to_string(),
                start_command: String::new(),
                ready_pattern: None,
                health_check_url: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                test_commands: TestCommands::new(),
                test_timeout_secs: None,
                poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
                startup_delay_secs: DEFAULT_STARTUP_DELAY_SECS,
            },
        }
    }

    /// Set suite name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the shell command that launches the service
    pub fn start_command<S: Into<String>>(mut self, command: S) -> Self {
        self.config.start_command = command.into();
        self
    }

    /// Set the output substring that marks the service ready
    pub fn ready_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.config.ready_pattern = Some(pattern.into());
        self
    }

    /// Set the HTTP health-check URL
    pub fn health_check_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.health_check_url = Some(url.into());
        self
    }

    /// Set the readiness timeout (whole seconds)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    /// Add a named test command
    pub fn test<N: Into<String>, C: Into<String>>(mut self, name: N, command: C) -> Self {
        self.config.test_commands.insert(name, command);
        self
    }

    /// Add a test named after its command; repeats are kept
    pub fn script<C: Into<String>>(mut self, command: C) -> Self {
        self.config.test_commands.push_command(command);
        self
    }

    /// Set the per-test timeout (whole seconds)
    pub fn test_timeout(mut self, timeout: Duration) -> Self {
        self.config.test_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Set the health-check polling interval (whole seconds)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_secs = interval.as_secs();
        self
    }

    /// Set the fallback startup delay used without a ready pattern (whole seconds)
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.config.startup_delay_secs = delay.as_secs();
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServiceConfig {
        self.config
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
