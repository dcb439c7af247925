//! HTTP readiness probe
//!
//! Polls a health-check URL until it answers with a success status or the
//! overall timeout elapses. Only the status class is consulted.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Upper bound for a single GET attempt
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP health-check client
#[derive(Clone)]
pub struct ReadinessProbe {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ReadinessProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-attempt timeout (fluent API)
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Issue a single GET; `Ok(true)` for any 2xx status
    pub async fn check(&self, url: &str) -> Result<bool, reqwest::Error> {
        self.check_within(url, self.request_timeout).await
    }

    async fn check_within(&self, url: &str, limit: Duration) -> Result<bool, reqwest::Error> {
        let response = self.client.get(url).timeout(limit).send().await?;
        Ok(response.status().is_success())
    }

    /// Poll `url` every `interval` until it reports healthy or `timeout` elapses.
    ///
    /// With no URL configured this is a no-op that reports ready immediately.
    /// Connection and DNS failures only mean "not ready yet".
    pub async fn poll(&self, url: Option<&str>, timeout: Duration, interval: Duration) -> bool {
        let Some(url) = url else {
            debug!("No health check configured, trusting process readiness");
            return true;
        };

        info!("🩺 Waiting for health check {} (timeout {:?})", url, timeout);
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            attempts += 1;
            match self.check_within(url, self.request_timeout.min(remaining)).await {
                Ok(true) => {
                    info!("✅ Health check passed after {} attempt(s)", attempts);
                    return true;
                }
                Ok(false) => debug!("Health check attempt {} returned a non-success status", attempts),
                Err(e) => debug!("Health check attempt {} failed: {}", attempts, e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sleep(interval.min(remaining)).await;
        }

        warn!("⏰ Health check {} not satisfied within {:?} ({} attempts)", url, timeout, attempts);
        false
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_is_immediately_ready() {
        let probe = ReadinessProbe::new();
        let started = std::time::Instant::now();
        assert!(probe.poll(None, Duration::from_secs(30), Duration::from_secs(5)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_times_out() {
        // Bind then drop a listener to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{port}/health");

        let probe = ReadinessProbe::new();
        let started = std::time::Instant::now();
        let ready = probe
            .poll(Some(&url), Duration::from_millis(600), Duration::from_millis(100))
            .await;

        assert!(!ready);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
