//! Link resolution and URL normalisation for extracted candidates.
//!
//! Source pages link to results in several shapes: relative paths, absolute
//! addresses, and redirect wrappers like `/search/redirect?redirect_url=...`
//! or `/l/?uddg=...`. [`resolve_link`] turns any of them into the canonical
//! destination address, or rejects it if it does not point into the onion
//! network.

use url::Url;

/// Host suffix of the target network.
pub const NETWORK_SUFFIX: &str = ".onion";

/// Redirect wrappers used by source pages: the wrapper path (without a
/// trailing slash) and the query parameter carrying the real destination.
const REDIRECT_WRAPPERS: &[(&str, &str)] = &[
    ("/search/redirect", "redirect_url"),
    ("/l", "uddg"),
];

/// Redirect wrappers nested deeper than this are rejected.
const MAX_UNWRAP_DEPTH: usize = 3;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "search_term",
    "rut",
];

/// Resolve a raw `href` found on a page served from `base`.
///
/// 1. Skip empty, fragment-only, `javascript:` and `mailto:` links.
/// 2. Resolve relative links against `base`.
/// 3. Unwrap known redirect wrappers to recover the true destination.
///    A result's own query parameters are left alone.
/// 4. Keep only `http`/`https` addresses whose host ends in
///    [`NETWORK_SUFFIX`].
/// 5. Normalise with [`normalize_url`].
///
/// Returns `None` if the link is not a usable onion address.
pub fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }

    let mut url = base.join(href).ok()?;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match unwrap_redirect(&url) {
            Some(inner) => url = inner,
            None => break,
        }
    }
    if unwrap_redirect(&url).is_some() {
        return None;
    }

    if !matches!(url.scheme(), "http" | "https") || !is_onion_host(&url) {
        return None;
    }
    Some(normalize_url(url.as_str()))
}

/// Returns `true` if the host of `url` is in the onion network.
pub fn is_onion_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.to_ascii_lowercase().ends_with(NETWORK_SUFFIX))
}

/// The destination carried by a redirect wrapper, if `url` is one.
fn unwrap_redirect(url: &Url) -> Option<Url> {
    let path = url.path().trim_end_matches('/');
    let (_, param) = REDIRECT_WRAPPERS.iter().find(|(p, _)| *p == path)?;
    url.query_pairs()
        .find(|(key, _)| key.as_ref() == *param)
        .and_then(|(_, value)| Url::parse(&value).ok())
}

/// Normalise a URL for deduplication comparison.
///
/// Applies the following transformations:
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Remove default ports (`:80` for HTTP, `:443` for HTTPS).
/// 3. Remove trailing slash from the path (unless path is exactly `"/"`).
/// 4. Sort remaining query parameters alphabetically by key.
/// 5. Strip known tracking parameters.
/// 6. Remove the fragment (`#…`).
///
/// If the input cannot be parsed as a valid URL, it is returned unchanged.
///
/// # Examples
///
/// ```
/// use onion_search::links::normalize_url;
///
/// let a = normalize_url("http://ABC.onion/path/?b=2&a=1#top");
/// let b = normalize_url("http://abc.onion/path?a=1&b=2");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    // Url::parse already lowercases scheme and host.
    parsed.to_string()
}

fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}
