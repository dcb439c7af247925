//! Service output forwarding
//!
//! Each supervised process gets one reader task per pipe. Readers push lines
//! into a bounded channel; a single forwarder task drains it, hands every line
//! to the injected observer, appends it to the bounded log buffer and fires
//! the ready signal the first time the ready pattern shows up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::traits::OutputObserver;
use shared::service_info;

/// Keep only the last 10000 lines to prevent memory issues
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

const LINE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Bounded ring of captured output lines; the oldest line is dropped past capacity
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The last `count` lines, oldest first
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let skip = lines.len().saturating_sub(count);
        lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Default observer: re-emit every service line as a tracing event
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl OutputObserver for TracingObserver {
    fn on_line(&self, service: &str, line: &OutputLine) {
        service_info!(service, stream = ?line.stream, "{}", line.text);
    }
}

/// Background tasks draining one process's output
pub struct OutputForwarder {
    readers: Vec<JoinHandle<()>>,
    forwarder: JoinHandle<()>,
}

impl OutputForwarder {
    /// Spawn readers for both pipes plus the forwarding task.
    ///
    /// Returns the ready receiver when a pattern is given. The receiver errors
    /// if both pipes close before the pattern was seen.
    pub fn spawn<O, E>(
        service: String,
        stdout: Option<O>,
        stderr: Option<E>,
        ready_pattern: Option<String>,
        buffer: LogBuffer,
        observer: Arc<dyn OutputObserver>,
    ) -> (Self, Option<oneshot::Receiver<String>>)
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (line_tx, mut line_rx) = mpsc::channel::<OutputLine>(LINE_CHANNEL_CAPACITY);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(spawn_line_reader(stdout, OutputStream::Stdout, line_tx.clone()));
        }
        if let Some(stderr) = stderr {
            readers.push(spawn_line_reader(stderr, OutputStream::Stderr, line_tx.clone()));
        }
        drop(line_tx);

        let (ready_tx, ready_rx) = match ready_pattern {
            Some(_) => {
                let (tx, rx) = oneshot::channel();
                (Some(tx), Some(rx))
            }
            None => (None, None),
        };

        let forwarder = tokio::spawn(async move {
            let mut ready_tx = ready_tx;

            while let Some(line) = line_rx.recv().await {
                observer.on_line(&service, &line);

                // Buffer first so the ready line is visible to whoever wakes up
                let matched = ready_tx.is_some()
                    && ready_pattern
                        .as_deref()
                        .is_some_and(|pattern| line.text.contains(pattern));
                buffer.push(line.text.clone());

                if matched {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(line.text);
                    }
                }
            }
        });

        (Self { readers, forwarder }, ready_rx)
    }

    /// Wait up to `grace` for the streams to drain, then abort whatever is left
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = tokio::time::timeout(grace, &mut self.forwarder).await;
        self.abort();
    }

    pub fn abort(&self) {
        for reader in &self.readers {
            reader.abort();
        }
        self.forwarder.abort();
    }
}

fn spawn_line_reader<R>(reader: R, stream: OutputStream, tx: mpsc::Sender<OutputLine>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();

        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&raw).trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(OutputLine { stream, text }).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}
