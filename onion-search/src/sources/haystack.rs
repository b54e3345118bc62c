//! Haystack, a large onion crawler index.

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::extract::SelectorStrategy;
use crate::source::{endpoint, parse_page, SourceAdapter, SourceContext, SourceCore};
use crate::types::{SearchResult, SourceId};

const STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "haystack-search-result",
        item: ".search-result",
        link: "a",
        title: None,
        description: Some(".description"),
    },
    SelectorStrategy {
        name: "haystack-result",
        item: "div.result",
        link: "a",
        title: None,
        description: Some("p"),
    },
];

/// Haystack search source.
#[derive(Debug)]
pub struct HaystackSource {
    core: SourceCore,
}

impl HaystackSource {
    /// Create the source from its configured address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Config`] if the address is invalid.
    pub fn new(config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        Ok(Self {
            core: SourceCore::new(SourceId::Haystack, config, ctx)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for HaystackSource {
    fn name(&self) -> &str {
        SourceId::Haystack.name()
    }

    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let page = self.core.fetch(query, search_url).await?;
        parse_haystack_html(&page.body, &page.final_url, query, self.core.max_results())
    }
}

/// `{base}/search?q=<query>`
pub(crate) fn search_url(base: &Url, query: &str) -> Result<Url> {
    let mut url = endpoint(base, "search")?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(url)
}

pub(crate) fn parse_haystack_html(
    html: &str,
    base: &Url,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    parse_page(SourceId::Haystack, html, base, STRATEGIES, query, max_results)
}
