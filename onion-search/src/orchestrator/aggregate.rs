//! The merged, url-deduplicated result set.
//!
//! Results from every source land here. An address seen twice keeps one
//! entry, in the position of its first insertion, holding the higher-scored
//! variant. The set also records every source that returned each address.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::SearchResult;

/// Insertion-ordered set of [`SearchResult`] keyed by `url`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResultSet {
    results: Vec<SearchResult>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    contributors: Vec<Vec<String>>,
}

impl AggregateResultSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `result`, returning `true` if its address was new.
    pub fn insert(&mut self, result: SearchResult) -> bool {
        match self.index.get(&result.url) {
            Some(&pos) => {
                let sources = &mut self.contributors[pos];
                if !sources.contains(&result.source) {
                    sources.push(result.source.clone());
                }
                if result.score > self.results[pos].score {
                    self.results[pos] = result;
                }
                false
            }
            None => {
                self.index.insert(result.url.clone(), self.results.len());
                self.contributors.push(vec![result.source.clone()]);
                self.results.push(result);
                true
            }
        }
    }

    /// Number of unique addresses.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if the set holds no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns `true` if a result with this address is present.
    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    /// The result stored for `url`.
    pub fn get(&self, url: &str) -> Option<&SearchResult> {
        self.index.get(url).map(|&pos| &self.results[pos])
    }

    /// Every source that returned `url`, in arrival order.
    pub fn sources_for(&self, url: &str) -> &[String] {
        self.index
            .get(url)
            .map(|&pos| self.contributors[pos].as_slice())
            .unwrap_or(&[])
    }

    /// Results in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.results.iter()
    }

    /// Results by descending score; ties keep insertion order.
    pub fn ranked(&self) -> Vec<&SearchResult> {
        let mut ranked: Vec<&SearchResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Consume the set, returning results in insertion order.
    pub fn into_vec(self) -> Vec<SearchResult> {
        self.results
    }
}

impl Extend<SearchResult> for AggregateResultSet {
    fn extend<I: IntoIterator<Item = SearchResult>>(&mut self, iter: I) {
        for result in iter {
            self.insert(result);
        }
    }
}

impl FromIterator<SearchResult> for AggregateResultSet {
    fn from_iter<I: IntoIterator<Item = SearchResult>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a AggregateResultSet {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(url: &str, title: &str, source: &str, score: u32) -> SearchResult {
        SearchResult::new(url, title, None, source).with_score(score)
    }

    #[test]
    fn same_url_different_titles_merge() {
        let mut set = AggregateResultSet::new();
        assert!(set.insert(make_result("http://abc.onion/p", "ABC", "x", 1)));
        assert!(!set.insert(make_result("http://abc.onion/p", "ABC Mirror", "y", 1)));
        assert!(set.insert(make_result("http://def.onion/q", "", "y", 1)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("http://abc.onion/p").map(|r| r.title.as_str()), Some("ABC"));
    }

    #[test]
    fn higher_score_replaces_in_place() {
        let set: AggregateResultSet = vec![
            make_result("http://a.onion/", "A low", "x", 1),
            make_result("http://b.onion/", "B", "x", 2),
            make_result("http://a.onion/", "A high", "y", 9),
        ]
        .into_iter()
        .collect();

        let urls: Vec<_> = set.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.onion/", "http://b.onion/"]);
        assert_eq!(set.get("http://a.onion/").map(|r| r.score), Some(9));
        assert_eq!(set.sources_for("http://a.onion/"), ["x", "y"]);
    }

    #[test]
    fn equal_score_keeps_first_variant() {
        let mut set = AggregateResultSet::new();
        set.insert(make_result("http://a.onion/", "first", "x", 3));
        set.insert(make_result("http://a.onion/", "second", "y", 3));
        assert_eq!(set.get("http://a.onion/").map(|r| r.title.as_str()), Some("first"));
    }

    #[test]
    fn ranked_is_stable_on_ties() {
        let set: AggregateResultSet = vec![
            make_result("http://a.onion/", "A", "x", 2),
            make_result("http://b.onion/", "B", "x", 5),
            make_result("http://c.onion/", "C", "x", 2),
        ]
        .into_iter()
        .collect();
        let urls: Vec<_> = set.ranked().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["http://b.onion/", "http://a.onion/", "http://c.onion/"]);
    }

    #[test]
    fn unknown_url_has_no_sources() {
        let set = AggregateResultSet::new();
        assert!(set.sources_for("http://nowhere.onion/").is_empty());
        assert!(!set.contains("http://nowhere.onion/"));
        assert!(set.is_empty());
    }

    #[test]
    fn serialises_as_result_list() {
        let set: AggregateResultSet =
            vec![make_result("http://a.onion/", "A", "x", 2)].into_iter().collect();
        let json = serde_json::to_value(&set).expect("serialize");
        assert_eq!(json["results"][0]["url"], "http://a.onion/");
    }
}
