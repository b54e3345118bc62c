//! Multi-source fan-out with failure isolation and a full join.
//!
//! Every selected source runs in its own tokio task. The orchestrator waits
//! for all of them (or for the optional deadline), merges what succeeded into
//! an [`AggregateResultSet`], and records what failed. A failing or panicking
//! source never takes the others down with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::health::ProxyHealthCheck;
use crate::http::ReqwestTransport;
use crate::source::{SourceAdapter, SourceContext};
use crate::sources::create_enabled_sources;
use crate::types::SearchResult;

use super::aggregate::AggregateResultSet;

/// A source that produced no results because it failed.
#[derive(Debug)]
pub struct SourceFailure {
    /// Name of the failed source.
    pub source: String,
    /// Why it failed.
    pub error: SearchError,
}

/// Overall outcome of a search, as the caller should present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// At least one result, with the unique count.
    Found(usize),
    /// Nothing matched, or sources failed for reasons other than the proxy.
    NothingFound,
    /// Every queried source failed because the proxy was unreachable.
    ProxyUnreachable,
}

/// Merged results plus per-source failures.
#[derive(Debug, Default)]
pub struct SearchReport {
    /// Deduplicated results from all successful sources.
    pub results: AggregateResultSet,
    /// Sources that failed, in selection order.
    pub failures: Vec<SourceFailure>,
    /// How many sources were dispatched.
    pub sources_queried: usize,
}

impl SearchReport {
    /// Classify the outcome for display.
    pub fn status(&self) -> SearchStatus {
        if !self.results.is_empty() {
            return SearchStatus::Found(self.results.len());
        }
        let all_proxy = self.sources_queried > 0
            && self.failures.len() == self.sources_queried
            && self.failures.iter().all(|f| f.error.is_proxy_unavailable());
        if all_proxy {
            SearchStatus::ProxyUnreachable
        } else {
            SearchStatus::NothingFound
        }
    }
}

/// Runs searches across a fixed set of source adapters.
pub struct SearchOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    default_source: String,
    concurrent: bool,
    deadline: Option<Duration>,
}

impl SearchOrchestrator {
    /// Build an orchestrator over every enabled built-in source, routed
    /// through the configured SOCKS proxy.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for invalid settings and
    /// [`SearchError::Client`] if the proxied HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        let ctx = SourceContext {
            transport: Arc::new(ReqwestTransport::new(config)?),
            probe: Arc::new(ProxyHealthCheck::new(&config.proxy)),
        };
        Self::with_context(config, &ctx)
    }

    /// Build an orchestrator over every enabled built-in source using the
    /// given transport and proxy probe.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for invalid settings.
    pub fn with_context(config: &SearchConfig, ctx: &SourceContext) -> Result<Self> {
        config.validate()?;
        let adapters = create_enabled_sources(config, ctx)?;
        Ok(Self::from_adapters(config, adapters))
    }

    /// Build an orchestrator over explicit adapters.
    ///
    /// Only `default_source`, `concurrent` and `search_deadline_secs` are
    /// read from `config`.
    pub fn from_adapters(config: &SearchConfig, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            default_source: config.default_source.clone(),
            concurrent: config.concurrent,
            deadline: config.search_deadline_secs.map(Duration::from_secs),
        }
    }

    /// Names of the sources this orchestrator can query.
    pub fn available_sources(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Search `requested` sources for `query`.
    ///
    /// # Pipeline
    ///
    /// 1. Resolve requested names (case-insensitive); unknown or disabled
    ///    names are skipped with a warning, repeats are ignored
    /// 2. Fall back to the default source if nothing resolved
    /// 3. Run each source in its own task, concurrently or one after another
    /// 4. Wait for every task, or until the deadline aborts the stragglers
    /// 5. Merge successful results by `url`; record failures
    ///
    /// Never fails: problems surface through [`SearchReport::failures`] and
    /// [`SearchReport::status`].
    pub async fn search(&self, query: &str, requested: &[&str]) -> SearchReport {
        if query.trim().is_empty() {
            tracing::warn!("empty query, nothing to search");
            return SearchReport::default();
        }

        let selected = self.select(requested);
        if selected.is_empty() {
            tracing::warn!("no sources could be resolved");
            return SearchReport::default();
        }

        tracing::info!(
            sources = selected.len(),
            concurrent = self.concurrent,
            "starting search"
        );
        tracing::trace!(query, "search query");

        let deadline = self.deadline.map(|d| Instant::now() + d);
        let outcomes = if self.concurrent {
            let handles: Vec<_> = selected
                .iter()
                .map(|adapter| spawn_source(adapter, query))
                .collect();
            futures::future::join_all(
                handles
                    .into_iter()
                    .map(|(name, handle)| await_source(name, handle, deadline)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(selected.len());
            for adapter in &selected {
                let (name, handle) = spawn_source(adapter, query);
                outcomes.push(await_source(name, handle, deadline).await);
            }
            outcomes
        };

        let mut report = SearchReport {
            sources_queried: selected.len(),
            ..SearchReport::default()
        };
        for (source, outcome) in outcomes {
            match outcome {
                Ok(results) => {
                    tracing::debug!(%source, count = results.len(), "source returned results");
                    report.results.extend(results);
                }
                Err(error) => {
                    tracing::warn!(%source, %error, "source failed");
                    report.failures.push(SourceFailure { source, error });
                }
            }
        }

        tracing::info!(
            results = report.results.len(),
            failed = report.failures.len(),
            "search complete"
        );
        report
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
        let name = name.trim();
        self.adapters
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }

    fn select(&self, requested: &[&str]) -> Vec<Arc<dyn SourceAdapter>> {
        let mut selected: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        for name in requested {
            match self.find(name) {
                Some(adapter) => {
                    if !selected.iter().any(|s| s.name() == adapter.name()) {
                        selected.push(Arc::clone(adapter));
                    }
                }
                None => tracing::warn!(source = %name, "unknown or disabled source, skipping"),
            }
        }

        if selected.is_empty() {
            match self.find(&self.default_source) {
                Some(adapter) => {
                    tracing::warn!(
                        source = adapter.name(),
                        "no valid sources selected, using default"
                    );
                    selected.push(Arc::clone(adapter));
                }
                None => {
                    tracing::warn!(source = %self.default_source, "default source unavailable");
                }
            }
        }
        selected
    }
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("sources", &self.available_sources())
            .field("default_source", &self.default_source)
            .field("concurrent", &self.concurrent)
            .field("deadline", &self.deadline)
            .finish()
    }
}

type SourceTask = JoinHandle<Result<Vec<SearchResult>>>;

fn spawn_source(adapter: &Arc<dyn SourceAdapter>, query: &str) -> (String, SourceTask) {
    let adapter = Arc::clone(adapter);
    let query = query.to_owned();
    let name = adapter.name().to_owned();
    let handle = tokio::spawn(async move { adapter.try_search(&query).await });
    (name, handle)
}

async fn await_source(
    name: String,
    mut handle: SourceTask,
    deadline: Option<Instant>,
) -> (String, Result<Vec<SearchResult>>) {
    let joined = match deadline {
        Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                let error = SearchError::Timeout(format!(
                    "{name} did not finish before the search deadline"
                ));
                return (name, Err(error));
            }
        },
        None => handle.await,
    };

    let outcome = joined.unwrap_or_else(|e| {
        Err(SearchError::Unexpected(format!("source task failed: {e}")))
    });
    (name, outcome)
}
