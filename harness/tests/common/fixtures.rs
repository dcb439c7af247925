//! Test fixtures and data for harness tests

use std::time::Duration;

use harness::ServiceConfig;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Prints the ready line, then idles until terminated
    pub const READY_SERVICE: &'static str = "echo booting; echo 'service ready'; sleep 30";
    pub const READY_PATTERN: &'static str = "service ready";

    /// Spawns two background children before announcing readiness
    pub const FORKING_SERVICE: &'static str = "sleep 30 & sleep 30 & echo up; wait";

    /// Shell exits right after announcing readiness, leaving a background child
    pub const BACKGROUNDING_SERVICE: &'static str = "sleep 30 & echo ready";

    /// Exits before ever becoming ready
    pub const CRASHING_SERVICE: &'static str = "echo 'fatal: port in use' >&2; exit 3";

    /// Ignores SIGTERM so only SIGKILL ends it
    pub const STUBBORN_SERVICE: &'static str = "trap '' TERM; echo up; while true; do sleep 0.1; done";

    pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
    pub const START_TIMEOUT: Duration = Duration::from_secs(5);

    /// The canonical mixed pass/fail mapping
    pub fn mixed_tests() -> Vec<(&'static str, &'static str)> {
        vec![("a", "exit 0"), ("b", "exit 1")]
    }

    /// A suite whose service is ready immediately and whose tests all pass
    pub fn passing_config(name: &str) -> ServiceConfig {
        ServiceConfig::builder()
            .name(name)
            .start_command(Self::READY_SERVICE)
            .ready_pattern(Self::READY_PATTERN)
            .timeout(Self::START_TIMEOUT)
            .test("true", "exit 0")
            .test("echo", "echo hello")
            .build()
    }

    /// A config for mock-driven lifecycle tests; the command is never run
    pub fn mock_config(tests: &[(&str, &str)]) -> ServiceConfig {
        let mut builder = ServiceConfig::builder()
            .name("mocked")
            .start_command("./serve.sh")
            .timeout(Duration::from_secs(1));
        for (name, command) in tests {
            builder = builder.test(*name, *command);
        }
        builder.build()
    }

    /// A local URL on a port nothing listens on
    pub fn unreachable_url() -> String {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        format!("http://127.0.0.1:{port}/health")
    }
}
