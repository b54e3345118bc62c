//! Cached liveness probe for the local SOCKS proxy.
//!
//! A probe is a short-timeout TCP connect to the proxy port. The outcome,
//! available or not, is cached with [`moka`] for a fixed window so fetches
//! do not hammer the proxy with a connect before every request.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tokio::net::TcpStream;

use crate::config::ProxyConfig;

/// Answers whether the anonymising proxy is reachable.
#[async_trait]
pub trait ProxyProbe: Send + Sync {
    /// Returns `true` if the proxy accepted a connection recently.
    async fn is_available(&self) -> bool;

    /// Forget any cached outcome so the next check probes again.
    async fn invalidate(&self) {}
}

/// TCP liveness probe with a time-boxed result cache.
#[derive(Debug, Clone)]
pub struct ProxyHealthCheck {
    host: String,
    port: u16,
    probe_timeout: Duration,
    cache: Option<Cache<(), bool>>,
}

impl ProxyHealthCheck {
    /// Create a probe for the configured proxy endpoint.
    pub fn new(config: &ProxyConfig) -> Self {
        let cache = (config.health_cache_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(config.health_cache_secs))
                .build()
        });
        Self {
            host: config.host.clone(),
            port: config.port,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            cache,
        }
    }

    async fn probe(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let available = matches!(
            tokio::time::timeout(self.probe_timeout, connect).await,
            Ok(Ok(_))
        );
        if available {
            tracing::debug!(host = %self.host, port = self.port, "proxy reachable");
        } else {
            tracing::warn!(host = %self.host, port = self.port, "proxy not reachable");
        }
        available
    }
}

#[async_trait]
impl ProxyProbe for ProxyHealthCheck {
    async fn is_available(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.get_with((), self.probe()).await,
            None => self.probe().await,
        }
    }

    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&()).await;
        }
    }
}
