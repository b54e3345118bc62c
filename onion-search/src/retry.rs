//! Retry classification and backoff policy for proxied fetches.
//!
//! Two budgets apply:
//!
//! - **General**: timeouts, HTTP failures, and unexpected errors retry up to
//!   `max_retries` times with exponential backoff (`base * 2^attempt`).
//! - **Fast fail**: refused/unreachable connections usually mean the proxy
//!   itself is down, so they get a single retry after a short fixed delay.

use std::time::Duration;

use crate::config::SearchConfig;

/// Retries granted to connection-refused class failures.
pub const FAST_FAIL_RETRIES: u32 = 1;

/// Classification of the most recent fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connect or read timeout.
    Timeout,
    /// Connection refused, host unreachable, or proxy down.
    ConnectionRefused,
    /// Non-2xx HTTP status.
    HttpStatus,
    /// Anything else the transport reported.
    Unexpected,
}

impl FailureKind {
    /// Returns `true` for failures that use the fast-fail budget.
    pub fn is_fast_fail(self) -> bool {
        matches!(self, Self::ConnectionRefused)
    }
}

/// Decides whether a failed attempt is retried and how long to wait first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    fast_fail_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy from explicit parameters.
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        fast_fail_delay: Duration,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            fast_fail_delay,
        }
    }

    /// Build the policy described by `config`.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_secs(config.retry_base_delay_secs),
            Duration::from_secs(config.max_retry_delay_secs),
            Duration::from_secs(config.fast_fail_delay_secs),
        )
    }

    /// Maximum retries for the general (non fast-fail) budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based), or `None` once the
    /// budget for `kind` is spent.
    pub fn backoff(&self, attempt: u32, kind: FailureKind) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if kind.is_fast_fail() {
            return (attempt <= FAST_FAIL_RETRIES).then_some(self.fast_fail_delay);
        }
        if attempt > self.max_retries {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }

    /// Returns `true` if the caller should try again, after sleeping the
    /// backoff for this attempt.
    ///
    /// `attempt` counts failures so far, starting at 1 for the first failure.
    pub async fn should_retry(&self, attempt: u32, kind: FailureKind) -> bool {
        match self.backoff(attempt, kind) {
            Some(delay) => {
                tracing::debug!(
                    attempt,
                    ?kind,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}
