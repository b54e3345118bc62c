//! Core types for discovered results and source identification.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single item discovered by a source.
///
/// Identity is the normalised `url` alone: two results with the same `url`
/// are equal and hash the same, whatever their titles, descriptions, or
/// originating sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Normalised absolute address of the item.
    pub url: String,
    /// Link text or heading. May be empty; see [`SearchResult::display_title`].
    pub title: String,
    /// Snippet shown by the source, if any.
    pub description: Option<String>,
    /// Identifier of the source that produced this result.
    pub source: String,
    /// Relevance score assigned by the source adapter. Not part of identity.
    pub score: u32,
    /// When the result was extracted.
    pub discovered_at: DateTime<Utc>,
}

impl SearchResult {
    /// Create a result stamped with the current time.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description,
            source: source.into(),
            score: 0,
            discovered_at: Utc::now(),
        }
    }

    /// Set the relevance score.
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    /// Title for display, falling back to the URL when the title is blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for SearchResult {}

impl Hash for SearchResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Built-in onion search sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Ahmia, a filtered index of onion services.
    Ahmia,
    /// Torch, one of the oldest onion search engines.
    Torch,
    /// Haystack, a large onion crawler index.
    Haystack,
    /// DuckDuckGo's onion service, restricted to `.onion` sites.
    DuckDuckGo,
}

impl SourceId {
    /// Stable lowercase identifier used in settings and results.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ahmia => "ahmia",
            Self::Torch => "torch",
            Self::Haystack => "haystack",
            Self::DuckDuckGo => "duckduckgo",
        }
    }

    /// Human-readable description for source listings.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ahmia => "Ahmia Search Engine",
            Self::Torch => "Torch Search Engine",
            Self::Haystack => "Haystack Search Engine",
            Self::DuckDuckGo => "DuckDuckGo .onion Search",
        }
    }

    /// Returns all available source variants.
    pub fn all() -> &'static [SourceId] {
        &[Self::Ahmia, Self::Torch, Self::Haystack, Self::DuckDuckGo]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no known source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source: {}", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| UnknownSource(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_uses_url_only() {
        let a = SearchResult::new("http://abc.onion/p", "ABC", None, "torch");
        let b = SearchResult::new(
            "http://abc.onion/p",
            "ABC Mirror",
            Some("different".into()),
            "ahmia",
        )
        .with_score(9);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_urls_are_distinct() {
        let a = SearchResult::new("http://abc.onion/p", "Same", None, "torch");
        let b = SearchResult::new("http://abc.onion/q", "Same", None, "torch");
        assert_ne!(a, b);
    }

    #[test]
    fn display_title_falls_back_to_url() {
        let r = SearchResult::new("http://abc.onion/", "   ", None, "torch");
        assert_eq!(r.display_title(), "http://abc.onion/");
        let r = SearchResult::new("http://abc.onion/", "Market", None, "torch");
        assert_eq!(r.display_title(), "Market");
    }

    #[test]
    fn search_result_serialises_with_source_and_timestamp() {
        let r = SearchResult::new("http://abc.onion/", "ABC", None, "haystack").with_score(4);
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json["source"], "haystack");
        assert_eq!(json["score"], 4);
        assert!(json["discovered_at"].is_string());
    }

    #[test]
    fn source_id_parses_case_insensitively() {
        assert_eq!("Ahmia".parse::<SourceId>(), Ok(SourceId::Ahmia));
        assert_eq!(" TORCH ".parse::<SourceId>(), Ok(SourceId::Torch));
        assert_eq!("duckduckgo".parse::<SourceId>(), Ok(SourceId::DuckDuckGo));
        assert_eq!(
            "google".parse::<SourceId>(),
            Err(UnknownSource("google".into()))
        );
    }

    #[test]
    fn source_id_display_matches_name() {
        for id in SourceId::all() {
            assert_eq!(id.to_string(), id.name());
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn source_id_serde_uses_lowercase() {
        let json = serde_json::to_string(&SourceId::DuckDuckGo).expect("serialize");
        assert_eq!(json, "\"duckduckgo\"");
        let decoded: SourceId = serde_json::from_str("\"haystack\"").expect("deserialize");
        assert_eq!(decoded, SourceId::Haystack);
    }
}
