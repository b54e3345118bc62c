//! Fetch pipeline: proxy check, pacing, transport, retry.
//!
//! ```text
//! fetch(url)
//!   │
//!   ├─ proxy probe ── down ──► ProxyUnavailable (no network attempt)
//!   ├─ rate limiter wait
//!   ├─ transport GET ── ok ──► Ok(page)
//!   └─ classify error ── budget left ──► backoff, re-probe, loop
//!                      └─ spent ──────► Err(last error)
//! ```

use std::sync::Arc;

use url::Url;

use crate::error::{Result, SearchError};
use crate::health::ProxyProbe;
use crate::http::{FetchedPage, Transport};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;

/// Fetches documents through the proxy with pacing and retries.
///
/// Each source adapter owns one fetcher, so its limiter and retry budget
/// are never shared with another source. The transport and probe are shared.
pub struct ProxiedFetcher {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ProxyProbe>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ProxiedFetcher {
    /// Create a fetcher from its collaborators.
    pub fn new(
        transport: Arc<dyn Transport>,
        probe: Arc<dyn ProxyProbe>,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            probe,
            limiter,
            retry,
        }
    }

    /// Fetch `url`, retrying per the policy.
    ///
    /// Every attempt, including retries, re-checks the proxy and waits on the
    /// rate limiter first.
    ///
    /// # Errors
    ///
    /// - [`SearchError::ProxyUnavailable`] if the proxy probe still fails
    ///   after the fast-fail retry; no request is made while it is down.
    /// - The last classified error once the retry budget is exhausted.
    /// - Unclassified errors (bad address, parse) immediately.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let mut attempt = 0u32;
        loop {
            let outcome = if self.probe.is_available().await {
                self.limiter.wait().await;
                self.transport.get(url).await
            } else {
                Err(SearchError::ProxyUnavailable(format!(
                    "proxy not reachable, skipped {url}"
                )))
            };

            let err = match outcome {
                Ok(page) => return Ok(page),
                Err(err) => err,
            };

            attempt += 1;
            let Some(kind) = err.failure_kind() else {
                return Err(err);
            };
            if !self.retry.should_retry(attempt, kind).await {
                tracing::warn!(%url, attempts = attempt, error = %err, "giving up");
                return Err(err);
            }
            if err.is_proxy_unavailable() {
                self.probe.invalidate().await;
            }
            tracing::debug!(%url, attempt, error = %err, "fetch failed, retrying");
        }
    }
}

impl std::fmt::Debug for ProxiedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedFetcher")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays scripted outcomes; repeats the last one when exhausted.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<()>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<()>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn clone_outcome(outcome: &Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(SearchError::Timeout(m)) => Err(SearchError::Timeout(m.clone())),
            Err(SearchError::ConnectionFailed(m)) => Err(SearchError::ConnectionFailed(m.clone())),
            Err(SearchError::HttpFailure { status, url }) => Err(SearchError::HttpFailure {
                status: *status,
                url: url.clone(),
            }),
            Err(SearchError::InvalidAddress(m)) => Err(SearchError::InvalidAddress(m.clone())),
            Err(other) => Err(SearchError::Unexpected(other.to_string())),
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get(&self, url: &Url) -> Result<FetchedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = {
                let mut queue = self.outcomes.lock().expect("lock");
                if queue.len() > 1 {
                    queue.pop_front().expect("non-empty")
                } else {
                    clone_outcome(queue.front().expect("at least one outcome"))
                }
            };
            outcome.map(|()| FetchedPage {
                body: "<html></html>".into(),
                final_url: url.clone(),
                status: 200,
            })
        }
    }

    struct Probe(AtomicBool);

    #[async_trait]
    impl ProxyProbe for Probe {
        async fn is_available(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Down until invalidated once, then up; counts checks.
    struct Recovering {
        up: AtomicBool,
        checks: AtomicUsize,
    }

    #[async_trait]
    impl ProxyProbe for Recovering {
        async fn is_available(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.up.load(Ordering::SeqCst)
        }

        async fn invalidate(&self) {
            self.up.store(true, Ordering::SeqCst);
        }
    }

    fn probe(up: bool) -> Arc<Probe> {
        Arc::new(Probe(AtomicBool::new(up)))
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_secs(1),
            Duration::from_secs(30),
            Duration::from_secs(2),
        )
    }

    fn target() -> Url {
        Url::parse("http://abc.onion/search?q=x").expect("valid url")
    }

    fn timeout() -> Result<()> {
        Err(SearchError::Timeout("read".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let transport = Scripted::new(vec![Ok(())]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(3),
        );
        let page = fetcher.fetch(&target()).await.expect("fetch");
        assert_eq!(page.status, 200);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_timeouts_exhaust_retry_budget() {
        let transport = Scripted::new(vec![timeout()]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(3),
        );
        let err = fetcher.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)));
        assert_eq!(transport.calls(), 4, "1 initial + 3 retries");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_timeout_recovers() {
        let transport = Scripted::new(vec![timeout(), timeout(), Ok(())]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(3),
        );
        assert!(fetcher.fetch(&target()).await.is_ok());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connection_retries_at_most_once() {
        let transport = Scripted::new(vec![Err(SearchError::ConnectionFailed("refused".into()))]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(5),
        );
        let start = Instant::now();
        let err = fetcher.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, SearchError::ConnectionFailed(_)));
        assert_eq!(transport.calls(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn http_failures_use_general_budget() {
        let transport = Scripted::new(vec![Err(SearchError::HttpFailure {
            status: 503,
            url: "http://abc.onion/".into(),
        })]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(2),
        );
        let err = fetcher.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, SearchError::HttpFailure { status: 503, .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unclassified_error_is_not_retried() {
        let transport = Scripted::new(vec![Err(SearchError::InvalidAddress("bad".into()))]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::unlimited(),
            policy(3),
        );
        assert!(fetcher.fetch(&target()).await.is_err());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn proxy_down_fails_without_network_attempt() {
        let transport = Scripted::new(vec![Ok(())]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(false),
            RateLimiter::unlimited(),
            policy(3),
        );
        let start = Instant::now();
        let err = fetcher.fetch(&target()).await.unwrap_err();
        assert!(err.is_proxy_unavailable());
        assert_eq!(transport.calls(), 0);
        // One fast-fail retry, not the general budget.
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn proxy_down_once_is_retried_after_recheck() {
        let transport = Scripted::new(vec![Ok(())]);
        let probe = Arc::new(Recovering {
            up: AtomicBool::new(false),
            checks: AtomicUsize::new(0),
        });
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe.clone(),
            RateLimiter::unlimited(),
            policy(3),
        );
        let page = fetcher.fetch(&target()).await.expect("fetch after recovery");
        assert_eq!(page.status, 200);
        assert_eq!(probe.checks.load(Ordering::SeqCst), 2);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_fetches_are_paced() {
        let transport = Scripted::new(vec![Ok(())]);
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::new(2.0),
            policy(0),
        );
        let start = Instant::now();
        for _ in 0..5 {
            fetcher.fetch(&target()).await.expect("fetch");
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_paced_as_well() {
        let transport = Scripted::new(vec![timeout(), Ok(())]);
        // Backoff of 0s so only the limiter contributes.
        let fetcher = ProxiedFetcher::new(
            transport.clone(),
            probe(true),
            RateLimiter::new(0.25),
            RetryPolicy::new(3, Duration::ZERO, Duration::ZERO, Duration::ZERO),
        );
        let start = Instant::now();
        fetcher.fetch(&target()).await.expect("fetch");
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
