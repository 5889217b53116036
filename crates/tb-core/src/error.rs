//! Errors surfaced by trend queries.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while answering a trend query.
#[derive(Debug, Error)]
pub enum TrendError {
    /// A caller-supplied date could not be parsed.
    #[error("invalid {field}: {value:?} is not a date")]
    InvalidDateFormat { field: &'static str, value: String },

    /// The range start lies after its end.
    #[error("range start {start} is after range end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The store returned data that cannot be correct (e.g. a negative count).
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The event store failed to answer.
    #[error("event store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

/// Failure reported by an [`EventStore`](crate::EventStore) implementation.
#[derive(Debug, Error)]
#[error("store query failed: {source}")]
pub struct StoreError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    /// Wraps a backend error.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
