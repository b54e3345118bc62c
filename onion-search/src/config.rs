//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] holds everything the core needs from its host: where the
//! SOCKS proxy listens, how requests are paced, timed out and retried, and
//! which sources are enabled at which addresses. Every section deserialises
//! with `#[serde(default)]`, so a settings file only names what it changes.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SearchError;
use crate::types::SourceId;

/// Slowest non-zero pacing accepted: one request per hour.
pub const MIN_RATE_LIMIT: f64 = 1.0 / 3600.0;

/// Top-level configuration for a multi-source search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Local SOCKS proxy every request is routed through.
    pub proxy: ProxyConfig,
    /// Requests per second allowed per source. `0` disables pacing.
    pub rate_limit: f64,
    /// TCP + SOCKS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Response read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Retries for timeouts and transient HTTP failures.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub retry_base_delay_secs: u64,
    /// Upper bound for a single backoff sleep, in seconds.
    pub max_retry_delay_secs: u64,
    /// Fixed delay before the single retry of a refused connection.
    pub fast_fail_delay_secs: u64,
    /// How long a failed mirror is skipped, in seconds.
    pub mirror_cooldown_secs: u64,
    /// Maximum results kept from one source, highest-scored first.
    pub max_results_per_source: usize,
    /// Run sources concurrently. `false` runs them one after another.
    pub concurrent: bool,
    /// Optional wall-clock limit for the whole multi-source search.
    pub search_deadline_secs: Option<u64>,
    /// Custom User-Agent. If `None`, rotates through built-in browser strings.
    pub user_agent: Option<String>,
    /// Source used when none of the requested identifiers resolve.
    pub default_source: String,
    /// Per-source enable flags and addresses.
    pub sources: SourcesConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            rate_limit: 1.0,
            connect_timeout_secs: 5,
            read_timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_secs: 1,
            max_retry_delay_secs: 30,
            fast_fail_delay_secs: 2,
            mirror_cooldown_secs: 300,
            max_results_per_source: 50,
            concurrent: true,
            search_deadline_secs: None,
            user_agent: None,
            default_source: SourceId::Ahmia.name().to_owned(),
            sources: SourcesConfig::default(),
        }
    }
}

/// SOCKS proxy endpoint and liveness probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy host, usually loopback.
    pub host: String,
    /// Proxy SOCKS port.
    pub port: u16,
    /// TCP connect timeout for the liveness probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// How long a probe result is trusted, in seconds. `0` probes every time.
    pub health_cache_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9050,
            probe_timeout_ms: 2000,
            health_cache_secs: 60,
        }
    }
}

impl ProxyConfig {
    /// Proxy URL handed to the HTTP client.
    ///
    /// Uses `socks5h` so hostnames (including `.onion`) resolve on the
    /// proxy side rather than locally.
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

/// Enable flag and known addresses for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Whether the source may be queried at all.
    pub enabled: bool,
    /// Base addresses in preference order. More than one enables mirror rotation.
    pub mirrors: Vec<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mirrors: Vec::new(),
        }
    }
}

impl SourceSettings {
    fn enabled_at(mirrors: &[&str]) -> Self {
        Self {
            enabled: true,
            mirrors: mirrors.iter().map(|m| (*m).to_owned()).collect(),
        }
    }
}

/// Settings for every known source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Ahmia onion index.
    pub ahmia: SourceSettings,
    /// Torch onion search.
    pub torch: SourceSettings,
    /// Haystack onion search.
    pub haystack: SourceSettings,
    /// DuckDuckGo onion service, restricted to `.onion` results.
    pub duckduckgo: SourceSettings,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ahmia: SourceSettings::enabled_at(&[
                "http://juhanurmihxlp77nkq76byazcldy2hlmovfu2epvl5ankdibsot4csyd.onion",
                "https://ahmia.fi",
            ]),
            torch: SourceSettings::enabled_at(&[
                "http://torchdeedp3i2jigzjdmfpn5ttjhthh5wbmda2rr3jvqjg5p77c54dqd.onion",
            ]),
            haystack: SourceSettings::enabled_at(&[
                "http://haystak5njsmn2hqkewecpaxetahtwhsbsa64jom2k22z5afxhnpxfid.onion",
            ]),
            duckduckgo: SourceSettings::enabled_at(&[
                "https://duckduckgogg42xjoc72x3sjasowoarfbgcmvfimaftt6twagswzczad.onion",
            ]),
        }
    }
}

impl SourcesConfig {
    /// Settings for the given source.
    pub fn get(&self, id: SourceId) -> &SourceSettings {
        match id {
            SourceId::Ahmia => &self.ahmia,
            SourceId::Torch => &self.torch,
            SourceId::Haystack => &self.haystack,
            SourceId::DuckDuckGo => &self.duckduckgo,
        }
    }

    /// Mutable settings for the given source.
    pub fn get_mut(&mut self, id: SourceId) -> &mut SourceSettings {
        match id {
            SourceId::Ahmia => &mut self.ahmia,
            SourceId::Torch => &mut self.torch,
            SourceId::Haystack => &mut self.haystack,
            SourceId::DuckDuckGo => &mut self.duckduckgo,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - proxy host is non-empty and port is non-zero
    /// - `rate_limit` is finite, and either 0 or at least [`MIN_RATE_LIMIT`]
    /// - connect and read timeouts are greater than 0
    /// - `max_results_per_source` is greater than 0
    /// - every enabled source has at least one http(s) mirror address
    /// - `default_source` names a known source
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.proxy.host.trim().is_empty() {
            return Err(SearchError::Config("proxy host must not be empty".into()));
        }
        if self.proxy.port == 0 {
            return Err(SearchError::Config("proxy port must not be 0".into()));
        }
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            return Err(SearchError::Config(
                "rate_limit must be a finite value >= 0".into(),
            ));
        }
        if self.rate_limit > 0.0 && self.rate_limit < MIN_RATE_LIMIT {
            return Err(SearchError::Config(format!(
                "rate_limit must be 0 (unlimited) or at least {MIN_RATE_LIMIT} requests/second"
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(SearchError::Config(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.read_timeout_secs == 0 {
            return Err(SearchError::Config(
                "read_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.max_results_per_source == 0 {
            return Err(SearchError::Config(
                "max_results_per_source must be greater than 0".into(),
            ));
        }
        for id in SourceId::all() {
            let settings = self.sources.get(*id);
            if !settings.enabled {
                continue;
            }
            if settings.mirrors.is_empty() {
                return Err(SearchError::Config(format!(
                    "source {id} is enabled but has no mirrors"
                )));
            }
            for mirror in &settings.mirrors {
                let parsed = Url::parse(mirror).map_err(|e| {
                    SearchError::Config(format!("source {id} mirror {mirror:?}: {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(SearchError::Config(format!(
                        "source {id} mirror {mirror:?} must be http or https"
                    )));
                }
            }
        }
        if self.default_source.parse::<SourceId>().is_err() {
            return Err(SearchError::Config(format!(
                "default_source {:?} is not a known source",
                self.default_source
            )));
        }
        Ok(())
    }
}
