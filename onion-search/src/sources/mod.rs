//! Built-in onion search sources.
//!
//! Each module provides a struct implementing [`crate::source::SourceAdapter`]
//! that queries one index and parses its result page. [`create_source`] is
//! the factory keyed on [`SourceId`].

pub mod ahmia;
pub mod duckduckgo;
pub mod haystack;
pub mod torch;

use std::sync::Arc;

pub use ahmia::AhmiaSource;
pub use duckduckgo::DuckDuckGoSource;
pub use haystack::HaystackSource;
pub use torch::TorchSource;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::source::{SourceAdapter, SourceContext};
use crate::types::SourceId;

/// Build the adapter for `id`, or `None` if the source is disabled.
///
/// # Errors
///
/// Returns [`crate::SearchError::Config`] if the source's addresses are
/// invalid.
pub fn create_source(
    id: SourceId,
    config: &SearchConfig,
    ctx: &SourceContext,
) -> Result<Option<Arc<dyn SourceAdapter>>> {
    if !config.sources.get(id).enabled {
        return Ok(None);
    }
    let adapter: Arc<dyn SourceAdapter> = match id {
        SourceId::Ahmia => Arc::new(AhmiaSource::new(config, ctx)?),
        SourceId::Torch => Arc::new(TorchSource::new(config, ctx)?),
        SourceId::Haystack => Arc::new(HaystackSource::new(config, ctx)?),
        SourceId::DuckDuckGo => Arc::new(DuckDuckGoSource::new(config, ctx)?),
    };
    Ok(Some(adapter))
}

/// Build adapters for every enabled source, in [`SourceId::all`] order.
///
/// # Errors
///
/// Same as [`create_source`].
pub fn create_enabled_sources(
    config: &SearchConfig,
    ctx: &SourceContext,
) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters = Vec::new();
    for id in SourceId::all() {
        if let Some(adapter) = create_source(*id, config, ctx)? {
            adapters.push(adapter);
        }
    }
    Ok(adapters)
}
