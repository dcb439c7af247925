//! Service Suite Configuration
//!
//! One `ServiceConfig` describes a suite: the service to launch, how to tell
//! it is ready, and the named test commands to run against it.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shared::{ConfigError, ConfigResult};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_STARTUP_DELAY_SECS: u64 = 2;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_startup_delay_secs() -> u64 {
    DEFAULT_STARTUP_DELAY_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(alias = "start_script")]
    pub start_command: String,

    /// Substring of the service output that marks it ready
    #[serde(default)]
    pub ready_pattern: Option<String>,

    #[serde(default, rename = "health_check", alias = "health_check_url")]
    pub health_check_url: Option<String>,

    /// Applies separately to the ready pattern and to the health check
    #[serde(default = "default_timeout_secs", rename = "timeout")]
    pub timeout_secs: u64,

    #[serde(default, alias = "test_scripts")]
    pub test_commands: TestCommands,

    #[serde(default, rename = "test_timeout")]
    pub test_timeout_secs: Option<u64>,

    #[serde(default = "default_poll_interval_secs", rename = "poll_interval")]
    pub poll_interval_secs: u64,

    /// Fallback wait when no ready pattern is configured
    #[serde(default = "default_startup_delay_secs", rename = "startup_delay")]
    pub startup_delay_secs: u64,
}

impl ServiceConfig {
    /// Create a new builder
    pub fn builder() -> crate::config::builder::ServiceConfigBuilder {
        crate::config::builder::ServiceConfigBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout_secs.map(Duration::from_secs)
    }

    /// Check that every recognised field holds a usable value
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "<empty>"));
        }

        if self.start_command.trim().is_empty() {
            return Err(ConfigError::invalid(format!("{}.start_command", self.name), "<empty>"));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(format!("{}.timeout", self.name), "0"));
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(format!("{}.poll_interval", self.name), "0"));
        }

        if let Some(ref pattern) = self.ready_pattern {
            if pattern.is_empty() {
                return Err(ConfigError::invalid(format!("{}.ready_pattern", self.name), "<empty>"));
            }
        }

        if let Some(ref url) = self.health_check_url {
            let parsed = url::Url::parse(url)
                .map_err(|e| ConfigError::invalid(format!("{}.health_check", self.name), format!("{url} ({e})")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(format!("{}.health_check", self.name), url.clone()));
            }
        }

        Ok(())
    }
}

/// A single named test command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub name: String,
    pub command: String,
}

/// Ordered mapping of test name to shell command.
///
/// Deserializes from a JSON object (document order kept) or from a list of
/// commands, in which case each command doubles as its own name and a
/// repeated command is kept as a separate entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCommands(Vec<TestCommand>);

impl TestCommands {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a test, replacing the command of an existing test with the same name
    pub fn insert(&mut self, name: impl Into<String>, command: impl Into<String>) {
        let name = name.into();
        let command = command.into();
        match self.0.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.command = command,
            None => self.0.push(TestCommand { name, command }),
        }
    }

    /// Append a command named after itself. A repeated command still runs
    /// again, under its name suffixed with its list position.
    pub fn push_command(&mut self, command: impl Into<String>) {
        let command = command.into();
        let mut name = command.clone();
        let mut position = self.0.len() + 1;
        while self.0.iter().any(|t| t.name == name) {
            name = format!("{command} #{position}");
            position += 1;
        }
        self.0.push(TestCommand { name, command });
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestCommand> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for TestCommands {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut commands = TestCommands::new();
        for (name, command) in iter {
            commands.insert(name, command);
        }
        commands
    }
}

impl Serialize for TestCommands {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for test in &self.0 {
            map.serialize_entry(&test.name, &test.command)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TestCommands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TestCommandsVisitor;

        impl<'de> Visitor<'de> for TestCommandsVisitor {
            type Value = TestCommands;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of test name to command, or a list of commands")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut commands = TestCommands::new();
                while let Some((name, command)) = access.next_entry::<String, String>()? {
                    commands.insert(name, command);
                }
                Ok(commands)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut commands = TestCommands::new();
                while let Some(command) = access.next_element::<String>()? {
                    commands.push_command(command);
                }
                Ok(commands)
            }
        }

        deserializer.deserialize_any(TestCommandsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_commands_keep_document_order() {
        let json = r#"{"zeta": "exit 0", "alpha": "exit 1", "mid": "true"}"#;
        let commands: TestCommands = serde_json::from_str(json).unwrap();

        let names: Vec<&str> = commands.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_test_commands_from_list() {
        let json = r#"["./bench.sh", "./smoke.sh"]"#;
        let commands: TestCommands = serde_json::from_str(json).unwrap();

        assert_eq!(commands.len(), 2);
        let first = commands.iter().next().unwrap();
        assert_eq!(first.name, "./bench.sh");
        assert_eq!(first.command, "./bench.sh");
    }

    #[test]
    fn test_repeated_list_entries_all_run() {
        let json = r#"["./smoke.sh", "./bench.sh", "./smoke.sh"]"#;
        let commands: TestCommands = serde_json::from_str(json).unwrap();

        let entries: Vec<(&str, &str)> = commands.iter().map(|t| (t.name.as_str(), t.command.as_str())).collect();
        assert_eq!(
            entries,
            vec![
                ("./smoke.sh", "./smoke.sh"),
                ("./bench.sh", "./bench.sh"),
                ("./smoke.sh #3", "./smoke.sh"),
            ]
        );
    }

    #[test]
    fn test_service_config_accepts_script_aliases() {
        let json = r#"{
            "name": "sglang",
            "start_script": "python -m server",
            "ready_pattern": "fired up",
            "health_check": "http://localhost:30000/health",
            "test_scripts": {"bench": "./bench.sh"}
        }"#;
        let config: ServiceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.start_command, "python -m server");
        assert_eq!(config.health_check_url.as_deref(), Some("http://localhost:30000/health"));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.test_commands.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = ServiceConfig::builder().name("svc").start_command("sleep 10").build();
        assert!(base.validate().is_ok());

        let empty_command = ServiceConfig::builder().name("svc").start_command("  ").build();
        assert!(empty_command.validate().is_err());

        let zero_timeout = ServiceConfig::builder()
            .name("svc")
            .start_command("sleep 10")
            .timeout(Duration::ZERO)
            .build();
        assert!(zero_timeout.validate().is_err());

        let bad_url = ServiceConfig::builder()
            .name("svc")
            .start_command("sleep 10")
            .health_check_url("not a url")
            .build();
        assert!(bad_url.validate().is_err());

        let ftp_url = ServiceConfig::builder()
            .name("svc")
            .start_command("sleep 10")
            .health_check_url("ftp://localhost/health")
            .build();
        assert!(ftp_url.validate().is_err());
    }

    #[test]
    fn test_insert_replaces_existing_name() {
        let mut commands = TestCommands::new();
        commands.insert("a", "exit 0");
        commands.insert("b", "exit 1");
        commands.insert("a", "exit 2");

        let collected: Vec<(&str, &str)> = commands.iter().map(|t| (t.name.as_str(), t.command.as_str())).collect();
        assert_eq!(collected, vec![("a", "exit 2"), ("b", "exit 1")]);
    }
}
