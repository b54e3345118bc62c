//! Relevance scoring for extracted candidates.
//!
//! Scores are small non-negative integers built from term matches and a few
//! quality signals:
//!
//! | signal | points |
//! |---|---|
//! | query term in title (case-insensitive) | +3 per term |
//! | query term in description | +1 per term |
//! | title contains `.onion` | +2 |
//! | title shorter than 10 or longer than 100 chars | −1 |
//! | description empty | −1 |
//! | description 50–300 chars | +1 |
//! | title looks like an error page | −2 |
//! | description looks like an error page | −1 |
//!
//! The total is floored at zero, and a candidate without a title scores zero.
//! Adapters drop zero-scored candidates.

use crate::links::NETWORK_SUFFIX;

const BOOLEAN_CONNECTIVES: &[&str] = &["and", "or", "not"];
const ERROR_PATTERNS: &[&str] = &["404", "not found", "error"];

const TITLE_MIN_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 100;
const SUBSTANTIAL_DESCRIPTION: std::ops::RangeInclusive<usize> = 50..=300;

/// Split a query into lowercase scoring terms.
///
/// Whitespace separates terms; the connectives `AND`, `OR` and `NOT` (any
/// case) are dropped, as are quotes and parentheses around terms.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| matches!(c, '"' | '\'' | '(' | ')'))
                .to_lowercase()
        })
        .filter(|word| !word.is_empty() && !BOOLEAN_CONNECTIVES.contains(&word.as_str()))
        .collect()
}

/// Score a candidate against pre-split query `terms`.
pub fn relevance_score(terms: &[String], title: &str, description: &str) -> u32 {
    let title = title.trim();
    if title.is_empty() {
        return 0;
    }
    let description = description.trim();
    let title_lc = title.to_lowercase();
    let description_lc = description.to_lowercase();

    let mut score: i32 = 0;
    for term in terms {
        if title_lc.contains(term.as_str()) {
            score += 3;
        }
        if description_lc.contains(term.as_str()) {
            score += 1;
        }
    }

    if title_lc.contains(NETWORK_SUFFIX) {
        score += 2;
    }

    let title_len = title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
        score -= 1;
    }

    if description.is_empty() {
        score -= 1;
    } else if SUBSTANTIAL_DESCRIPTION.contains(&description.chars().count()) {
        score += 1;
    }

    if looks_like_error(&title_lc) {
        score -= 2;
    }
    if looks_like_error(&description_lc) {
        score -= 1;
    }

    u32::try_from(score.max(0)).unwrap_or(0)
}

fn looks_like_error(lowercase_text: &str) -> bool {
    ERROR_PATTERNS.iter().any(|p| lowercase_text.contains(p))
}
