//! Candidate extraction from source result pages.
//!
//! Source markup drifts over time, so each source declares an ordered list
//! of [`SelectorStrategy`] values. [`extract_candidates`] applies them in
//! order and keeps the output of the first one that yields anything. If none
//! match, every onion link on the page becomes a candidate.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{Result, SearchError};
use crate::links::resolve_link;

/// One way of locating result entries in a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorStrategy {
    /// Label used in logs.
    pub name: &'static str,
    /// Selector for one result entry.
    pub item: &'static str,
    /// Selector, inside an entry, for the result link.
    pub link: &'static str,
    /// Selector for the title. `None` uses the link text.
    pub title: Option<&'static str>,
    /// Selector for the snippet. `None` means the source shows none.
    pub description: Option<&'static str>,
}

/// A raw extracted item before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Resolved, normalised onion address.
    pub url: String,
    /// Whitespace-collapsed title, possibly empty.
    pub title: String,
    /// Whitespace-collapsed snippet, possibly empty.
    pub description: String,
}

/// Extract candidates from `html`, resolving links against `base`.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if a strategy holds an invalid selector.
pub fn extract_candidates(
    html: &str,
    base: &Url,
    strategies: &[SelectorStrategy],
) -> Result<Vec<Candidate>> {
    let document = Html::parse_document(html);

    for strategy in strategies {
        let found = apply_strategy(&document, base, strategy)?;
        if !found.is_empty() {
            tracing::debug!(
                strategy = strategy.name,
                count = found.len(),
                "selector strategy matched"
            );
            return Ok(found);
        }
    }

    let found = any_onion_link(&document, base)?;
    tracing::debug!(count = found.len(), "fell back to onion link scan");
    Ok(found)
}

fn apply_strategy(
    document: &Html,
    base: &Url,
    strategy: &SelectorStrategy,
) -> Result<Vec<Candidate>> {
    let item_sel = selector(strategy.item, strategy.name)?;
    let link_sel = selector(strategy.link, strategy.name)?;
    let title_sel = strategy
        .title
        .map(|s| selector(s, strategy.name))
        .transpose()?;
    let description_sel = strategy
        .description
        .map(|s| selector(s, strategy.name))
        .transpose()?;

    let mut candidates = Vec::new();
    for item in document.select(&item_sel) {
        let Some(link) = item.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(|h| resolve_link(h, base)) else {
            continue;
        };

        let title = match &title_sel {
            Some(sel) => item.select(sel).next().map(text_of).unwrap_or_default(),
            None => text_of(link),
        };
        let description = description_sel
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(text_of)
            .unwrap_or_default();

        candidates.push(Candidate {
            url,
            title,
            description,
        });
    }
    Ok(candidates)
}

fn any_onion_link(document: &Html, base: &Url) -> Result<Vec<Candidate>> {
    let anchor_sel = selector("a[href]", "fallback")?;
    Ok(document
        .select(&anchor_sel)
        .filter_map(|a| {
            let url = a.value().attr("href").and_then(|h| resolve_link(h, base))?;
            Some(Candidate {
                url,
                title: text_of(a),
                description: String::new(),
            })
        })
        .collect())
}

fn selector(css: &str, strategy: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("invalid selector {css:?} in {strategy}: {e:?}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
