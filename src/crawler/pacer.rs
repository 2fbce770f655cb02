//! Client-side request pacing
//!
//! Each descriptor pipeline owns one [`Pacer`]; nothing is shared between
//! concurrent pipelines.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive requests
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_request: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: None,
        }
    }

    /// Time still to wait before the next request may go out
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let elapsed = now.duration_since(last);
        (elapsed < self.interval).then(|| self.interval - elapsed)
    }

    /// Waits out the remaining interval, then records a request
    pub async fn wait(&mut self) {
        if let Some(delay) = self.time_until_ready(Instant::now()) {
            tracing::trace!("Pacing next request by {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        self.last_request = Some(Instant::now());
    }
}
