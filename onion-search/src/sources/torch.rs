//! Torch, one of the oldest onion search engines.

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::extract::SelectorStrategy;
use crate::source::{endpoint, parse_page, SourceAdapter, SourceContext, SourceCore};
use crate::types::{SearchResult, SourceId};

const STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "torch-result-item",
        item: ".result-item",
        link: ".title a",
        title: None,
        description: Some(".description"),
    },
    SelectorStrategy {
        name: "torch-result",
        item: "div.result",
        link: "h5 a",
        title: None,
        description: Some("p"),
    },
];

/// Torch search source.
#[derive(Debug)]
pub struct TorchSource {
    core: SourceCore,
}

impl TorchSource {
    /// Create the source from its configured address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Config`] if the address is invalid.
    pub fn new(config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        Ok(Self {
            core: SourceCore::new(SourceId::Torch, config, ctx)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for TorchSource {
    fn name(&self) -> &str {
        SourceId::Torch.name()
    }

    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let page = self.core.fetch(query, search_url).await?;
        parse_torch_html(&page.body, &page.final_url, query, self.core.max_results())
    }
}

/// `{base}/search?query=<query>&action=search`
pub(crate) fn search_url(base: &Url, query: &str) -> Result<Url> {
    let mut url = endpoint(base, "search")?;
    url.query_pairs_mut()
        .append_pair("query", query)
        .append_pair("action", "search");
    Ok(url)
}

pub(crate) fn parse_torch_html(
    html: &str,
    base: &Url,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    parse_page(SourceId::Torch, html, base, STRATEGIES, query, max_results)
}
