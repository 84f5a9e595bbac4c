//! Rate limiting for upstream fetches.
//!
//! The upstream source tolerates one request every few seconds. A single
//! [`FetchGate`] is shared by every caller that talks to it — the refresh
//! drivers and on-demand query fetches alike — so all outbound requests
//! serialize through one minimum-interval clock. The clock only advances
//! on *successful* fetches; failed attempts do not push the next request
//! further out.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Minimum-interval gate keyed off the last successful fetch.
#[derive(Debug)]
pub struct FetchGate {
    /// Required spacing between upstream requests.
    min_interval: Duration,
    /// When the last successful fetch completed. `None` until the first
    /// success, so startup is never delayed.
    last_success: Mutex<Option<Instant>>,
}

impl FetchGate {
    /// Create a gate enforcing `min_interval` between successful fetches.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_success: Mutex::new(None),
        }
    }

    /// Suspend until at least `min_interval` has passed since the last
    /// successful fetch. Returns immediately if none has happened yet.
    pub async fn wait_ready(&self) {
        loop {
            let wait = self.remaining_wait().await;
            if wait.is_zero() {
                return;
            }
            tracing::debug!("rate limit: waiting {}ms before next request", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }

    /// Record a successful fetch, restarting the interval from now.
    pub async fn record_success(&self) {
        *self.last_success.lock().await = Some(Instant::now());
    }

    /// Time left until the gate opens. Zero when ready.
    pub async fn remaining_wait(&self) -> Duration {
        match *self.last_success.lock().await {
            None => Duration::ZERO,
            Some(stamp) => self.min_interval.saturating_sub(stamp.elapsed()),
        }
    }
}
