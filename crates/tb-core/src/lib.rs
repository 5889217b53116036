//! Core domain logic for the trend dashboard.
//!
//! This crate contains the fundamental types and logic for:
//! - Calendar bucketing: day/week/month intervals covering a query range
//! - Aggregation: assigning inventory and visit events to buckets
//! - Running totals: rebuilding absolute product counts from windowed deltas
//! - Trend queries: orchestrating the above over an injected event store

mod aggregate;
pub mod calendar;
mod error;
pub mod event;
pub mod granularity;
pub mod response;
mod running_total;
pub mod service;
pub mod types;

pub use aggregate::{
    InventoryTally, assign, bucket_index, distinct_sessions, tally_inventory,
    unique_visitors_per_bucket,
};
pub use calendar::{Bucket, TimeRange, bucket_containing, generate_buckets};
pub use error::{StoreError, TrendError};
pub use event::{InventoryAction, InventoryEvent, Timestamped, VisitEvent};
pub use granularity::{Granularity, UnknownGranularity};
pub use response::{ProductBucket, ProductTrend, VisitorBucket, VisitorStats};
pub use running_total::{RunningTotals, reconstruct};
pub use service::{DEFAULT_RANGE_DAYS, EventStore, TrendQuery, TrendService, parse_date};
pub use types::{SessionId, ValidationError};
