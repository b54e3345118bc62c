//! Search orchestrator: concurrent multi-source fan-out and url dedup.
//!
//! This module dispatches a query to the selected sources, isolates their
//! failures from one another, and merges their results into a single
//! [`AggregateResultSet`].

pub mod aggregate;
pub mod search;

pub use aggregate::AggregateResultSet;
pub use search::{SearchOrchestrator, SearchReport, SearchStatus, SourceFailure};
