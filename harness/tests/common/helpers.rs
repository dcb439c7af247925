//! Test helpers for harness tests
//!
//! Mock builders, a fake supervisor for behaviour mockall cannot express
//! (hanging and panicking), a recording output observer and a local health
//! endpoint served by axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use harness::runtime::{OutputLine, ProcessTree};
use harness::traits::MockServiceSupervisor;
use harness::{OutputObserver, Ready, ServiceSupervisor, StartError, StopError};
use shared::ProcessState;

/// Observer that keeps every line it receives
#[derive(Default)]
pub struct RecordingObserver {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_for(&self, service: &str) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == service)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl OutputObserver for RecordingObserver {
    fn on_line(&self, service: &str, line: &OutputLine) {
        self.lines.lock().unwrap().push((service.to_string(), line.text.clone()));
    }
}

#[derive(Clone)]
struct HealthState {
    hits: Arc<AtomicUsize>,
    fail_first: usize,
}

async fn health(State(state): State<HealthState>) -> StatusCode {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hit > state.fail_first {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Health endpoint that answers 503 for the first `fail_first` requests, then 200
pub struct HealthServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl HealthServer {
    pub async fn spawn(fail_first: usize) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = HealthState {
            hits: hits.clone(),
            fail_first,
        };
        let app = Router::new().route("/health", get(health)).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/health"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// `start` never resolves on its own
    HangOnStart,
    /// Starts cleanly, then panics when the runner checks liveness
    PanicOnTests,
}

/// Hand-rolled supervisor counting `stop` calls
pub struct FakeSupervisor {
    behaviour: FakeBehaviour,
    stops: Arc<AtomicUsize>,
    state: ProcessState,
}

impl FakeSupervisor {
    pub fn new(behaviour: FakeBehaviour) -> (Self, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let fake = Self {
            behaviour,
            stops: stops.clone(),
            state: ProcessState::Starting,
        };
        (fake, stops)
    }
}

#[async_trait::async_trait]
impl ServiceSupervisor for FakeSupervisor {
    async fn start(
        &mut self,
        _command: &str,
        _ready_pattern: Option<String>,
        _timeout: Duration,
    ) -> Result<Ready, StartError> {
        if self.behaviour == FakeBehaviour::HangOnStart {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.state = ProcessState::Running;
        Ok(Ready::DelayElapsed)
    }

    async fn stop(&mut self) -> Result<(), StopError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.state = ProcessState::Stopped;
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        if self.behaviour == FakeBehaviour::PanicOnTests {
            panic!("supervisor exploded while checking liveness");
        }
        self.state == ProcessState::Running
    }

    fn state(&self) -> ProcessState {
        self.state
    }

    fn recent_output(&self, _count: usize) -> Vec<String> {
        Vec::new()
    }
}

/// Collection of helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Starts cleanly, stays alive and expects exactly one stop
    pub fn healthy_mock() -> MockServiceSupervisor {
        let mut mock = MockServiceSupervisor::new();
        mock.expect_start().times(1).returning(|_, _, _| Ok(Ready::DelayElapsed));
        mock.expect_is_running().return_const(true);
        mock.expect_recent_output().returning(|_| Vec::new());
        mock.expect_state().return_const(ProcessState::Running);
        mock.expect_stop().times(1).returning(|| Ok(()));
        mock
    }

    /// Never becomes ready; still expects exactly one stop
    pub fn failing_start_mock() -> MockServiceSupervisor {
        let mut mock = MockServiceSupervisor::new();
        mock.expect_start().times(1).returning(|_, pattern, timeout| {
            Err(StartError::Timeout {
                pattern: pattern.unwrap_or_default(),
                timeout,
            })
        });
        mock.expect_recent_output().returning(|_| vec!["last words".to_string()]);
        mock.expect_is_running().times(0);
        mock.expect_state().return_const(ProcessState::Failed);
        mock.expect_stop().times(1).returning(|| Ok(()));
        mock
    }

    /// Poll until `pid` is gone (zombies count as gone) or `within` elapses
    pub async fn wait_until_dead(pid: u32, within: Duration) -> bool {
        let mut tree = ProcessTree::new();
        let deadline = Instant::now() + within;
        loop {
            if !tree.is_alive(pid).unwrap_or(false) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
