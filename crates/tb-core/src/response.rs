//! Response shapes returned by trend queries.
//!
//! Field names serialize in camelCase and dates as `YYYY-MM-DD`.

use chrono::NaiveDate;
use serde::Serialize;

/// Inventory figures for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBucket {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub products_added: u64,
    pub products_removed: u64,
    /// Absolute product count after this bucket.
    pub total_products: i64,
}

/// Product trend over a query range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTrend {
    pub current_total: i64,
    pub trend: Vec<ProductBucket>,
}

/// Unique visitors for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorBucket {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub visitors: usize,
}

/// Visitor statistics over a query range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    /// Distinct sessions over the whole range (not the sum of buckets).
    pub total_visitors: usize,
    pub visitors_by_bucket: Vec<VisitorBucket>,
}
