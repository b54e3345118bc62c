//! The capability every search source implements, plus the machinery the
//! built-in sources share.
//!
//! A source builds its request address, fetches through its own
//! [`ProxiedFetcher`] (optionally rotating mirrors), parses the page with its
//! selector strategies, then scores, filters and ranks the candidates.
//! Failures never escape [`SourceAdapter::search`]; they become an empty list
//! and a warning.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::extract::{extract_candidates, Candidate, SelectorStrategy};
use crate::fetch::ProxiedFetcher;
use crate::health::ProxyProbe;
use crate::http::{FetchedPage, Transport};
use crate::mirror::MirrorSelector;
use crate::rate_limit::RateLimiter;
use crate::ranking::{query_terms, relevance_score};
use crate::retry::RetryPolicy;
use crate::types::{SearchResult, SourceId};

/// A search source queried by the orchestrator.
///
/// All implementations must be `Send + Sync`; each runs in its own task.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, matched case-insensitively against requests.
    fn name(&self) -> &str;

    /// Query the source, surfacing any failure.
    ///
    /// # Errors
    ///
    /// Returns the [`SearchError`] that ended the attempt once retries and
    /// mirrors are exhausted.
    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Query the source, turning any failure into an empty list.
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(source = self.name(), error = %err, "source search failed");
                Vec::new()
            }
        }
    }
}

/// Shared collaborators handed to every built-in source.
#[derive(Clone)]
pub struct SourceContext {
    /// Proxied HTTP transport.
    pub transport: Arc<dyn Transport>,
    /// Proxy liveness probe.
    pub probe: Arc<dyn ProxyProbe>,
}

impl std::fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContext").finish_non_exhaustive()
    }
}

/// Per-source state: fetcher, mirror tracking and result bound.
///
/// Owned by exactly one source; nothing in here is shared with another.
#[derive(Debug)]
pub struct SourceCore {
    id: SourceId,
    fetcher: ProxiedFetcher,
    mirrors: MirrorSelector,
    max_results: usize,
}

impl SourceCore {
    /// Build the core for `id` from its configured addresses.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the source has no addresses or one
    /// does not parse.
    pub fn new(id: SourceId, config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        let settings = config.sources.get(id);
        let addresses = settings
            .mirrors
            .iter()
            .map(|m| {
                Url::parse(m)
                    .map_err(|e| SearchError::Config(format!("source {id} mirror {m:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if addresses.is_empty() {
            return Err(SearchError::Config(format!("source {id} has no mirrors")));
        }

        let fetcher = ProxiedFetcher::new(
            Arc::clone(&ctx.transport),
            Arc::clone(&ctx.probe),
            RateLimiter::new(config.rate_limit),
            RetryPolicy::from_config(config),
        );
        let mirrors = MirrorSelector::new(
            addresses,
            Duration::from_secs(config.mirror_cooldown_secs),
        );

        Ok(Self {
            id,
            fetcher,
            mirrors,
            max_results: config.max_results_per_source,
        })
    }

    /// Which source this core belongs to.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Upper bound on results returned per search.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Mirror tracking for this source.
    pub fn mirrors(&self) -> &MirrorSelector {
        &self.mirrors
    }

    /// Fetch the result page for `query`.
    ///
    /// A single-address source fetches directly; several addresses go
    /// through the [`MirrorSelector`].
    pub async fn fetch(
        &self,
        query: &str,
        search_url: fn(&Url, &str) -> Result<Url>,
    ) -> Result<FetchedPage> {
        tracing::trace!(source = %self.id, query, "searching");
        let fetcher = &self.fetcher;

        if self.mirrors.len() == 1 {
            let base = self
                .mirrors
                .primary()
                .ok_or_else(|| SearchError::NoMirrorAvailable(self.id.to_string()))?;
            return fetcher.fetch(&search_url(&base, query)?).await;
        }

        self.mirrors
            .pick_and_fetch(|base| async move {
                let url = search_url(&base, query)?;
                fetcher.fetch(&url).await
            })
            .await
    }
}

/// Score, filter, dedupe and rank raw candidates for one source.
///
/// - Duplicate addresses keep their first occurrence.
/// - Zero-scored candidates are dropped.
/// - The rest are sorted by descending score (stable) and cut to
///   `max_results`.
pub fn rank_candidates(
    source: SourceId,
    query: &str,
    candidates: Vec<Candidate>,
    max_results: usize,
) -> Vec<SearchResult> {
    let terms = query_terms(query);
    let extracted = candidates.len();
    let mut seen = HashSet::new();

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .filter_map(|c| {
            let score = relevance_score(&terms, &c.title, &c.description);
            (score > 0).then(|| {
                let description = (!c.description.is_empty()).then_some(c.description);
                SearchResult::new(c.url, c.title, description, source.name()).with_score(score)
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(max_results);

    tracing::debug!(
        source = %source,
        extracted,
        kept = results.len(),
        "ranked candidates"
    );
    results
}

/// Resolve a source endpoint such as `search/` under a mirror address.
///
/// The mirror's own path is kept as a prefix, so a mirror served from
/// `http://host.onion/engine` yields `http://host.onion/engine/search/`.
/// Any query or fragment on the mirror address is dropped.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut root = base.clone();
    root.set_query(None);
    root.set_fragment(None);
    if !root.path().ends_with('/') {
        let prefixed = format!("{}/", root.path());
        root.set_path(&prefixed);
    }
    Ok(root.join(path.trim_start_matches('/'))?)
}

/// Extract and rank candidates from a fetched page.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if a selector is invalid.
pub(crate) fn parse_page(
    source: SourceId,
    html: &str,
    base: &Url,
    strategies: &[SelectorStrategy],
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let candidates = extract_candidates(html, base, strategies)?;
    Ok(rank_candidates(source, query, candidates, max_results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_under_bare_origin() {
        let base = Url::parse("http://abc.onion").expect("valid url");
        let url = endpoint(&base, "search/").expect("endpoint");
        assert_eq!(url.as_str(), "http://abc.onion/search/");
    }

    #[test]
    fn endpoint_keeps_mirror_path_prefix() {
        for raw in ["http://abc.onion/engine", "http://abc.onion/engine/"] {
            let base = Url::parse(raw).expect("valid url");
            let url = endpoint(&base, "search").expect("endpoint");
            assert_eq!(url.as_str(), "http://abc.onion/engine/search", "{raw}");
        }
    }

    #[test]
    fn endpoint_drops_mirror_query() {
        let base = Url::parse("http://abc.onion/engine?lang=en#top").expect("valid url");
        let url = endpoint(&base, "html/").expect("endpoint");
        assert_eq!(url.as_str(), "http://abc.onion/engine/html/");
    }

    fn candidate(url: &str, title: &str, description: &str) -> Candidate {
        Candidate {
            url: url.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    #[test]
    fn rank_drops_zero_scores_and_duplicates() {
        let candidates = vec![
            candidate("http://a.onion/", "Bitcoin mixer service", "bitcoin"),
            candidate("http://a.onion/", "Bitcoin mixer mirror", "bitcoin"),
            candidate("http://b.onion/", "Cooking recipes", ""),
        ];
        let ranked = rank_candidates(SourceId::Torch, "bitcoin", candidates, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Bitcoin mixer service");
        assert_eq!(ranked[0].source, "torch");
        assert_eq!(ranked[0].description.as_deref(), Some("bitcoin"));
    }

    #[test]
    fn rank_sorts_descending_and_truncates() {
        let candidates = vec![
            candidate("http://a.onion/", "Wallet index page", ""),
            candidate("http://b.onion/", "Bitcoin wallet list", "bitcoin wallet"),
            candidate("http://c.onion/", "Bitcoin index page", ""),
        ];
        let ranked = rank_candidates(SourceId::Ahmia, "bitcoin wallet", candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].url, "http://b.onion/");
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn rank_keeps_extraction_order_on_ties() {
        let candidates = vec![
            candidate("http://a.onion/", "Market index one", ""),
            candidate("http://b.onion/", "Market index two", ""),
        ];
        let ranked = rank_candidates(SourceId::Haystack, "market", candidates, 10);
        let urls: Vec<_> = ranked.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.onion/", "http://b.onion/"]);
    }

    #[test]
    fn empty_description_becomes_none() {
        let ranked = rank_candidates(
            SourceId::Torch,
            "market",
            vec![candidate("http://a.onion/", "Market index page", "")],
            10,
        );
        assert!(ranked[0].description.is_none());
    }

    #[test]
    fn source_adapter_is_object_safe() {
        fn assert_object_safe(_: Option<Arc<dyn SourceAdapter>>) {}
        assert_object_safe(None);
    }
}
