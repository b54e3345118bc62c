//! Error types for the onion-search crate.
//!
//! Every failure a source can hit maps onto one [`SearchError`] variant.
//! Network-level variants also carry a retry classification through
//! [`SearchError::failure_kind`], which the fetch layer feeds into its
//! retry policy.

use crate::retry::FailureKind;

/// Errors that can occur while querying onion search sources.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The local SOCKS proxy did not accept a connection.
    #[error("proxy unavailable: {0}")]
    ProxyUnavailable(String),

    /// A request address could not be parsed or built.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A connect or read phase exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection was refused or the host was unreachable.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpFailure {
        /// Response status code.
        status: u16,
        /// Address that produced the status.
        url: String,
    },

    /// The response document did not have a usable shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Every mirror of a source is cooling down or failed.
    #[error("no source available: {0}")]
    NoMirrorAvailable(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The query was empty after trimming.
    #[error("search query must not be empty")]
    EmptyQuery,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Any other transport failure, or a source task that crashed.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl SearchError {
    /// Retry classification for this error, or `None` if retrying cannot help.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Timeout(_) => Some(FailureKind::Timeout),
            Self::ProxyUnavailable(_) | Self::ConnectionFailed(_) => {
                Some(FailureKind::ConnectionRefused)
            }
            Self::HttpFailure { .. } => Some(FailureKind::HttpStatus),
            Self::Unexpected(_) => Some(FailureKind::Unexpected),
            Self::InvalidAddress(_)
            | Self::Parse(_)
            | Self::NoMirrorAvailable(_)
            | Self::Config(_)
            | Self::EmptyQuery
            | Self::Client(_) => None,
        }
    }

    /// Returns `true` if the failure is the proxy itself being unreachable.
    pub fn is_proxy_unavailable(&self) -> bool {
        matches!(self, Self::ProxyUnavailable(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map_or_else(|| "<unknown>".to_owned(), |u| u.to_string());
        if err.is_timeout() {
            Self::Timeout(format!("{url}: {err}"))
        } else if err.is_connect() {
            Self::ConnectionFailed(format!("{url}: {err}"))
        } else if err.is_builder() {
            Self::InvalidAddress(format!("{url}: {err}"))
        } else if let Some(status) = err.status() {
            Self::HttpFailure {
                status: status.as_u16(),
                url,
            }
        } else {
            Self::Unexpected(format!("{url}: {err}"))
        }
    }
}

impl From<url::ParseError> for SearchError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

/// Convenience type alias for onion-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
