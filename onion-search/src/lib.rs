//! # onion-search
//!
//! Multi-source search aggregation for onion services, routed through a
//! local SOCKS proxy.
//!
//! Given a query and a set of sources, this crate fetches each source's
//! result page through the proxy, extracts candidate links with per-source
//! selector strategies, scores and filters them, and merges everything into
//! one deduplicated, ranked set.
//!
//! ## Design
//!
//! - One task per source; a failing or crashing source yields no results
//!   but never aborts the search
//! - Per-source pacing ([`RateLimiter`]), retry with backoff
//!   ([`RetryPolicy`]), and mirror rotation with cooldown
//!   ([`MirrorSelector`])
//! - A cached TCP probe ([`ProxyHealthCheck`]) so a dead proxy fails fast
//!   instead of timing out on every request
//! - Results are identified by normalised `url` alone
//!
//! ## Security
//!
//! - All traffic uses `socks5h`, so DNS also resolves through the proxy
//! - There is no direct-connection fallback; redirects stay on the proxy
//! - Search queries are logged only at trace level

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod health;
pub mod http;
pub mod links;
pub mod mirror;
pub mod orchestrator;
pub mod ranking;
pub mod rate_limit;
pub mod retry;
pub mod source;
pub mod sources;
pub mod types;

pub use config::{ProxyConfig, SearchConfig, SourceSettings, SourcesConfig};
pub use error::{Result, SearchError};
pub use fetch::ProxiedFetcher;
pub use health::{ProxyHealthCheck, ProxyProbe};
pub use http::{FetchedPage, ReqwestTransport, Transport};
pub use mirror::MirrorSelector;
pub use orchestrator::{
    AggregateResultSet, SearchOrchestrator, SearchReport, SearchStatus, SourceFailure,
};
pub use rate_limit::RateLimiter;
pub use retry::{FailureKind, RetryPolicy};
pub use source::{SourceAdapter, SourceContext};
pub use types::{SearchResult, SourceId};

/// Search the given sources through the configured proxy.
///
/// Builds a [`SearchOrchestrator`] for `config` and runs one search. Source
/// names are matched case-insensitively; unknown names are skipped, and if
/// none resolve the configured default source is used.
///
/// # Errors
///
/// Returns [`SearchError::EmptyQuery`] for a blank query,
/// [`SearchError::Config`] for invalid settings, or [`SearchError::Client`]
/// if the proxied client cannot be built. Source failures are not errors;
/// they are reported in [`SearchReport::failures`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> onion_search::Result<()> {
/// let config = onion_search::SearchConfig::default();
/// let report = onion_search::search("bitcoin AND wallet", &["ahmia", "torch"], &config).await?;
/// for result in report.results.ranked() {
///     println!("{}: {}", result.display_title(), result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, sources: &[&str], config: &SearchConfig) -> Result<SearchReport> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let orchestrator = SearchOrchestrator::new(config)?;
    Ok(orchestrator.search(query, sources).await)
}
