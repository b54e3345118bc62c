//! Per-source request pacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive requests of one source.
///
/// Each source adapter owns its own limiter, so sources pace themselves
/// independently. Waiting suspends only the calling task.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` requests.
    ///
    /// A rate of zero (or anything not positive and finite) disables pacing,
    /// as does a rate so small its interval cannot be represented.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = (requests_per_second.is_finite() && requests_per_second > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / requests_per_second).ok())
            .flatten();
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    /// Minimum spacing between requests, if pacing is enabled.
    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Wait until `min_interval` has passed since the previous call, then
    /// record this call. The first call never waits.
    pub async fn wait(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };

        // Held across the sleep so concurrent callers on one source queue up.
        let mut last = self.last_request.lock().await;
        if let Some(ready_at) = (*last).and_then(|previous| previous.checked_add(interval)) {
            if Instant::now() < ready_at {
                tracing::trace!(
                    delay_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "rate limiting request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
