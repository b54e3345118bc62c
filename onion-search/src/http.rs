//! Proxied HTTP transport with User-Agent rotation.
//!
//! Every request goes through the configured SOCKS proxy using the
//! `socks5h` scheme, so `.onion` hostnames resolve on the proxy side.
//! There is no direct-connection fallback: if the client cannot be built
//! with the proxy, construction fails.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use url::Url;

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";
const MAX_REDIRECTS: usize = 5;

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Decoded response body.
    pub body: String,
    /// Address after following redirects. Relative links resolve against this.
    pub final_url: Url,
    /// HTTP status code (always 2xx).
    pub status: u16,
}

/// Performs one GET through the anonymising proxy.
///
/// Implementations do not retry; retries and pacing belong to
/// [`crate::fetch::ProxiedFetcher`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, returning the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SearchError`] for timeouts, refused connections,
    /// non-2xx statuses, or anything else the client reports.
    async fn get(&self, url: &Url) -> Result<FetchedPage>;
}

/// [`Transport`] backed by a SOCKS-proxied [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: Option<String>,
}

impl ReqwestTransport {
    /// Build a transport for `config`.
    ///
    /// The client has:
    /// - All traffic routed through `config.proxy` with remote DNS
    /// - Separate connect and read timeouts
    /// - At most five redirects, followed inside the proxied client
    /// - Brotli and gzip decompression
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if the proxy address is invalid or the
    /// client cannot be constructed.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let proxy = reqwest::Proxy::all(config.proxy.socks_url())
            .map_err(|e| SearchError::Client(format!("invalid proxy address: {e}")))?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| SearchError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or_else(|| random_user_agent())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<FetchedPage> {
        tracing::trace!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.user_agent())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_EN)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::HttpFailure {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        tracing::debug!(%final_url, status = status.as_u16(), bytes = body.len(), "fetched");

        Ok(FetchedPage {
            body,
            final_url,
            status: status.as_u16(),
        })
    }
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array; choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}
