//! Trend query orchestration.
//!
//! # Algorithm Summary
//!
//! 1. Resolve the date range (defaults to the last week ending today) and
//!    normalize it to whole days
//! 2. Generate calendar buckets over the range
//! 3. Fetch the range's events from the store and fold them into buckets
//! 4. For inventory, seed a running total with the pre-range product count

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::aggregate::{distinct_sessions, tally_inventory, unique_visitors_per_bucket};
use crate::calendar::{Bucket, TimeRange, generate_buckets};
use crate::error::{StoreError, TrendError};
use crate::event::{InventoryEvent, VisitEvent};
use crate::granularity::Granularity;
use crate::response::{ProductBucket, ProductTrend, VisitorBucket, VisitorStats};
use crate::running_total::reconstruct;

/// Number of days covered when the caller gives no dates (today included).
pub const DEFAULT_RANGE_DAYS: u32 = 7;

/// Read access to the event store.
///
/// Range queries are inclusive on both ends and return events ordered by
/// timestamp ascending.
pub trait EventStore {
    /// Inventory changes with `start <= occurred_at <= end`.
    fn inventory_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<InventoryEvent>, StoreError>;

    /// Visits with `start <= occurred_at <= end`.
    fn visit_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitEvent>, StoreError>;

    /// Number of products created before `instant` and still active at that point.
    fn count_active_before(&self, instant: DateTime<Utc>) -> Result<i64, StoreError>;
}

impl<S: EventStore + ?Sized> EventStore for &S {
    fn inventory_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<InventoryEvent>, StoreError> {
        (**self).inventory_events_between(start, end)
    }

    fn visit_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitEvent>, StoreError> {
        (**self).visit_events_between(start, end)
    }

    fn count_active_before(&self, instant: DateTime<Utc>) -> Result<i64, StoreError> {
        (**self).count_active_before(instant)
    }
}

/// Caller-supplied query parameters, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    /// First day, `YYYY-MM-DD` or RFC 3339.
    pub start_date: Option<String>,
    /// Last day, `YYYY-MM-DD` or RFC 3339.
    pub end_date: Option<String>,
    /// `day`, `week` or `month`; anything else means `day`.
    pub bucket: Option<String>,
}

/// Resolved range and buckets for one query.
#[derive(Debug)]
struct QueryPlan {
    range: TimeRange,
    buckets: Vec<Bucket>,
}

/// Answers product and visitor trend queries against an injected store.
#[derive(Debug, Clone)]
pub struct TrendService<S> {
    store: S,
    default_range_days: u32,
}

impl<S: EventStore> TrendService<S> {
    pub const fn new(store: S) -> Self {
        Self {
            store,
            default_range_days: DEFAULT_RANGE_DAYS,
        }
    }

    /// Overrides how many days a query without dates covers (minimum 1).
    #[must_use]
    pub fn with_default_range_days(mut self, days: u32) -> Self {
        self.default_range_days = days.max(1);
        self
    }

    /// Product additions, removals and running totals per bucket.
    pub fn product_trends(&self, query: &TrendQuery) -> Result<ProductTrend, TrendError> {
        self.product_trends_at(query, Utc::now())
    }

    /// Like [`product_trends`](Self::product_trends) with an explicit clock.
    pub fn product_trends_at(
        &self,
        query: &TrendQuery,
        now: DateTime<Utc>,
    ) -> Result<ProductTrend, TrendError> {
        let plan = self.plan(query, now)?;

        let events = self
            .store
            .inventory_events_between(plan.range.start(), plan.range.end())?;
        tracing::debug!(events = events.len(), "fetched inventory events");
        let tallies = tally_inventory(&events, &plan.buckets);

        let baseline = self.store.count_active_before(plan.range.start())?;
        tracing::debug!(baseline, "fetched baseline product count");
        let totals = reconstruct(baseline, &tallies)?;

        let trend = plan
            .buckets
            .iter()
            .zip(&tallies)
            .zip(&totals.per_bucket)
            .map(|((bucket, tally), total)| ProductBucket {
                start_date: bucket.start_date(),
                end_date: bucket.end_date(),
                products_added: tally.added,
                products_removed: tally.removed,
                total_products: *total,
            })
            .collect();

        Ok(ProductTrend {
            current_total: totals.final_total,
            trend,
        })
    }

    /// Unique visitors per bucket and over the whole range.
    pub fn visitor_stats(&self, query: &TrendQuery) -> Result<VisitorStats, TrendError> {
        self.visitor_stats_at(query, Utc::now())
    }

    /// Like [`visitor_stats`](Self::visitor_stats) with an explicit clock.
    pub fn visitor_stats_at(
        &self,
        query: &TrendQuery,
        now: DateTime<Utc>,
    ) -> Result<VisitorStats, TrendError> {
        let plan = self.plan(query, now)?;

        let visits = self
            .store
            .visit_events_between(plan.range.start(), plan.range.end())?;
        tracing::debug!(visits = visits.len(), "fetched visit events");

        let visitors_by_bucket = plan
            .buckets
            .iter()
            .zip(unique_visitors_per_bucket(&visits, &plan.buckets))
            .map(|(bucket, visitors)| VisitorBucket {
                start_date: bucket.start_date(),
                end_date: bucket.end_date(),
                visitors,
            })
            .collect();

        Ok(VisitorStats {
            total_visitors: distinct_sessions(&visits),
            visitors_by_bucket,
        })
    }

    fn plan(&self, query: &TrendQuery, now: DateTime<Utc>) -> Result<QueryPlan, TrendError> {
        let granularity = Granularity::parse_or_default(query.bucket.as_deref());
        let range = self.resolve_range(query, now)?;
        let buckets = generate_buckets(range.start(), range.end(), granularity)?;
        tracing::debug!(
            start = %range.start(),
            end = %range.end(),
            %granularity,
            buckets = buckets.len(),
            "resolved trend query"
        );
        Ok(QueryPlan { range, buckets })
    }

    fn resolve_range(&self, query: &TrendQuery, now: DateTime<Utc>) -> Result<TimeRange, TrendError> {
        let today = now.date_naive();
        let start = match non_blank(query.start_date.as_deref()) {
            Some(value) => parse_date("startDate", value)?,
            None => today
                .checked_sub_days(Days::new(u64::from(self.default_range_days - 1)))
                .unwrap_or(NaiveDate::MIN),
        };
        let end = match non_blank(query.end_date.as_deref()) {
            Some(value) => parse_date("endDate", value)?,
            None => today,
        };
        TimeRange::for_dates(start, end)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Parses a calendar date given as `YYYY-MM-DD` or as an RFC 3339 timestamp.
///
/// Timestamps are reduced to their UTC calendar date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, TrendError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc).date_naive());
    }
    Err(TrendError::InvalidDateFormat {
        field,
        value: value.to_string(),
    })
}
