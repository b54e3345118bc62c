//! Ahmia, a filtered index of onion services.
//!
//! Reachable both as an onion service and on the clearnet, so it is the one
//! built-in source that rotates mirrors. Result links point at Ahmia's own
//! `/search/redirect` endpoint with the destination in `redirect_url`.

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::extract::SelectorStrategy;
use crate::source::{endpoint, parse_page, SourceAdapter, SourceContext, SourceCore};
use crate::types::{SearchResult, SourceId};

const STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "ahmia-results",
        item: "li.result",
        link: "h4 a",
        title: None,
        description: Some("p"),
    },
    SelectorStrategy {
        name: "ahmia-results-page",
        item: "#ahmiaResultsPage li",
        link: "a",
        title: None,
        description: Some("p"),
    },
];

/// Ahmia search source.
#[derive(Debug)]
pub struct AhmiaSource {
    core: SourceCore,
}

impl AhmiaSource {
    /// Create the source from its configured mirrors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Config`] if a mirror address is invalid.
    pub fn new(config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        Ok(Self {
            core: SourceCore::new(SourceId::Ahmia, config, ctx)?,
        })
    }

    /// Per-source state, including mirror health.
    pub fn core(&self) -> &SourceCore {
        &self.core
    }
}

#[async_trait]
impl SourceAdapter for AhmiaSource {
    fn name(&self) -> &str {
        SourceId::Ahmia.name()
    }

    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let page = self.core.fetch(query, search_url).await?;
        parse_ahmia_html(&page.body, &page.final_url, query, self.core.max_results())
    }
}

/// `{base}/search/?q=<query>`
pub(crate) fn search_url(base: &Url, query: &str) -> Result<Url> {
    let mut url = endpoint(base, "search/")?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(url)
}

pub(crate) fn parse_ahmia_html(
    html: &str,
    base: &Url,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    parse_page(SourceId::Ahmia, html, base, STRATEGIES, query, max_results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_AHMIA_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<ol class="searchResults">
  <li class="result">
    <h4><a href="/search/redirect?search_term=bitcoin&amp;redirect_url=http://mixerabc.onion/">Bitcoin Mixer Service</a></h4>
    <p>Anonymous bitcoin mixing with low fees and no logs kept on any of our servers.</p>
    <cite>mixerabc.onion</cite>
  </li>
  <li class="result">
    <h4><a href="/search/redirect?search_term=bitcoin&amp;redirect_url=http://walletdef.onion/guide">Bitcoin Wallet Guide</a></h4>
    <p>How to set up a wallet.</p>
  </li>
  <li class="result">
    <h4><a href="/search/redirect?search_term=bitcoin&amp;redirect_url=https://example.com/">Clearnet Bitcoin News</a></h4>
    <p>Not an onion service.</p>
  </li>
  <li class="result">
    <h4><a href="/search/redirect?search_term=bitcoin&amp;redirect_url=http://cooking.onion/">Cooking recipes</a></h4>
    <p></p>
  </li>
</ol>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("http://ahmiaxyz.onion/search/?q=bitcoin").expect("valid base")
    }

    #[test]
    fn search_url_encodes_query() {
        let base = Url::parse("https://ahmia.fi").expect("valid base");
        let url = search_url(&base, "bitcoin wallet").expect("build url");
        assert_eq!(url.as_str(), "https://ahmia.fi/search/?q=bitcoin+wallet");
    }

    #[test]
    fn search_url_keeps_mirror_path() {
        let base = Url::parse("http://gatewayxyz.onion/ahmia").expect("valid base");
        let url = search_url(&base, "market").expect("build url");
        assert_eq!(url.as_str(), "http://gatewayxyz.onion/ahmia/search/?q=market");
    }

    #[test]
    fn parse_mock_html_unwraps_redirects_and_filters() {
        let results = parse_ahmia_html(MOCK_AHMIA_HTML, &base(), "bitcoin", 50)
            .expect("should parse");
        let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["http://mixerabc.onion/", "http://walletdef.onion/guide"]);
        assert_eq!(results[0].title, "Bitcoin Mixer Service");
        assert_eq!(results[0].source, "ahmia");
        assert!(results[0]
            .description
            .as_deref()
            .is_some_and(|d| d.contains("mixing")));
    }

    #[test]
    fn parse_respects_max_results() {
        let results = parse_ahmia_html(MOCK_AHMIA_HTML, &base(), "bitcoin", 1)
            .expect("should parse");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        let results = parse_ahmia_html("<html><body></body></html>", &base(), "bitcoin", 50)
            .expect("should parse");
        assert!(results.is_empty());
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AhmiaSource>();
    }

    // ── Fixture-based parser tests ──────────────────────────────────────

    const FIXTURE_AHMIA_HTML: &str = include_str!("../../test-data/ahmia.html");

    #[test]
    fn fixture_extracts_onion_results() {
        let results = parse_ahmia_html(FIXTURE_AHMIA_HTML, &base(), "market", 50)
            .expect("fixture should parse");
        assert_eq!(results.len(), 4, "got: {results:#?}");
        for r in &results {
            assert!(r.url.contains(".onion"), "non-onion url: {}", r.url);
            assert!(r.score > 0);
        }
    }

    #[test]
    fn fixture_results_are_ranked() {
        let results = parse_ahmia_html(FIXTURE_AHMIA_HTML, &base(), "market", 50)
            .expect("fixture should parse");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn fixture_duplicate_destinations_collapse() {
        let results = parse_ahmia_html(FIXTURE_AHMIA_HTML, &base(), "market", 50)
            .expect("fixture should parse");
        let dupes = results
            .iter()
            .filter(|r| r.url == "http://dreammarketabc.onion/")
            .count();
        assert_eq!(dupes, 1);
    }
}
