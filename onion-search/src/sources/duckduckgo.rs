//! DuckDuckGo's onion service, restricted to onion results.
//!
//! Uses the HTML-only endpoint, which needs no JavaScript. The query gets a
//! `site:.onion` suffix, and result links are wrapped as `/l/?uddg=<target>`.

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::extract::SelectorStrategy;
use crate::source::{endpoint, parse_page, SourceAdapter, SourceContext, SourceCore};
use crate::types::{SearchResult, SourceId};

const SITE_RESTRICTION: &str = "site:.onion";

const STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "ddg-web-result",
        item: ".result:not(.result--ad)",
        link: ".result__title a, a.result__a",
        title: None,
        description: Some(".result__snippet"),
    },
    SelectorStrategy {
        name: "ddg-links-deep",
        item: ".results_links_deep",
        link: "a.result__url",
        title: Some(".result__title"),
        description: Some(".result__snippet"),
    },
];

/// DuckDuckGo onion search source.
#[derive(Debug)]
pub struct DuckDuckGoSource {
    core: SourceCore,
}

impl DuckDuckGoSource {
    /// Create the source from its configured address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Config`] if the address is invalid.
    pub fn new(config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        Ok(Self {
            core: SourceCore::new(SourceId::DuckDuckGo, config, ctx)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for DuckDuckGoSource {
    fn name(&self) -> &str {
        SourceId::DuckDuckGo.name()
    }

    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let page = self.core.fetch(query, search_url).await?;
        parse_duckduckgo_html(&page.body, &page.final_url, query, self.core.max_results())
    }
}

/// `{base}/html/?q=<query> site:.onion`
pub(crate) fn search_url(base: &Url, query: &str) -> Result<Url> {
    let mut url = endpoint(base, "html/")?;
    url.query_pairs_mut()
        .append_pair("q", &format!("{query} {SITE_RESTRICTION}"));
    Ok(url)
}

/// Scoring uses the caller's query, not the site-restricted one.
pub(crate) fn parse_duckduckgo_html(
    html: &str,
    base: &Url,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    parse_page(SourceId::DuckDuckGo, html, base, STRATEGIES, query, max_results)
}
