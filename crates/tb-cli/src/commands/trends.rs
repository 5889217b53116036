//! Product and visitor trend reports.
//!
//! Every failure on this path (config, database, query) is logged in full and
//! reported to the caller as a single generic message with exit status 1.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use tb_core::{EventStore, ProductTrend, TrendError, TrendQuery, TrendService, VisitorStats};

use crate::open_database;

/// Message shown to the user for any failed report.
pub const GENERIC_FAILURE: &str = "Internal Server Error";

#[derive(Debug, Clone, Default, Args)]
pub struct TrendArgs {
    /// First day of the range (YYYY-MM-DD or RFC 3339). Defaults to six days before the end.
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last day of the range (YYYY-MM-DD or RFC 3339). Defaults to today.
    #[arg(long)]
    pub end_date: Option<String>,

    /// Bucket size: day, week or month. Anything else means day.
    #[arg(long)]
    pub bucket: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl TrendArgs {
    fn to_query(&self) -> TrendQuery {
        TrendQuery {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            bucket: self.bucket.clone(),
        }
    }
}

/// Which report to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Products,
    Visitors,
}

/// A computed report, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendReport {
    Products(ProductTrend),
    Visitors(VisitorStats),
}

pub fn run(kind: ReportKind, args: &TrendArgs, config_path: Option<&Path>) -> ExitCode {
    let result = open_database(config_path).and_then(|(db, config)| {
        let service = TrendService::new(db).with_default_range_days(config.default_range_days);
        Ok(query(&service, kind, args, Utc::now())?)
    });

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    finish(&mut stdout, &mut stderr, args.json, result)
}

/// Runs one report against `service` as of `now`.
pub fn query<S: EventStore>(
    service: &TrendService<S>,
    kind: ReportKind,
    args: &TrendArgs,
    now: DateTime<Utc>,
) -> Result<TrendReport, TrendError> {
    let query = args.to_query();
    match kind {
        ReportKind::Products => service.product_trends_at(&query, now).map(TrendReport::Products),
        ReportKind::Visitors => service.visitor_stats_at(&query, now).map(TrendReport::Visitors),
    }
}

/// Writes the report, or the generic failure, and picks the exit code.
///
/// In JSON mode the failure body goes to `out` so callers always get JSON on
/// stdout; otherwise it goes to `err`.
pub fn finish<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    json: bool,
    result: Result<TrendReport>,
) -> ExitCode {
    let failure = match result {
        Ok(report) => match write_report(out, &report, json) {
            Ok(()) => return ExitCode::SUCCESS,
            Err(e) => anyhow::Error::new(e).context("failed to write report"),
        },
        Err(e) => e,
    };

    tracing::error!(error = format!("{failure:#}"), "trend report failed");
    let written = if json {
        write_failure(out, true)
    } else {
        write_failure(err, false)
    };
    if let Err(e) = written {
        tracing::error!(error = %e, "failed to write error response");
    }
    ExitCode::FAILURE
}

pub fn write_report<W: Write>(writer: &mut W, report: &TrendReport, json: bool) -> io::Result<()> {
    if json {
        match report {
            TrendReport::Products(trend) => serde_json::to_writer_pretty(&mut *writer, trend)?,
            TrendReport::Visitors(stats) => serde_json::to_writer_pretty(&mut *writer, stats)?,
        }
        return writeln!(writer);
    }

    match report {
        TrendReport::Products(trend) => write_products_table(writer, trend),
        TrendReport::Visitors(stats) => write_visitors_table(writer, stats),
    }
}

fn write_failure<W: Write>(writer: &mut W, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer(&mut *writer, &serde_json::json!({ "error": GENERIC_FAILURE }))?;
        writeln!(writer)
    } else {
        writeln!(writer, "{GENERIC_FAILURE}")
    }
}

fn write_products_table<W: Write>(writer: &mut W, trend: &ProductTrend) -> io::Result<()> {
    writeln!(
        writer,
        "{:<10}  {:<10}  {:>5}  {:>7}  {:>5}",
        "Start", "End", "Added", "Removed", "Total"
    )?;
    for bucket in &trend.trend {
        writeln!(
            writer,
            "{:<10}  {:<10}  {:>5}  {:>7}  {:>5}",
            bucket.start_date.to_string(),
            bucket.end_date.to_string(),
            bucket.products_added,
            bucket.products_removed,
            bucket.total_products
        )?;
    }
    writeln!(writer, "Current total: {}", trend.current_total)
}

fn write_visitors_table<W: Write>(writer: &mut W, stats: &VisitorStats) -> io::Result<()> {
    writeln!(writer, "{:<10}  {:<10}  {:>8}", "Start", "End", "Visitors")?;
    for bucket in &stats.visitors_by_bucket {
        writeln!(
            writer,
            "{:<10}  {:<10}  {:>8}",
            bucket.start_date.to_string(),
            bucket.end_date.to_string(),
            bucket.visitors
        )?;
    }
    writeln!(writer, "Total unique visitors: {}", stats.total_visitors)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use tb_db::Database;

    use crate::commands::seed;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 20, 12, 0, 0).unwrap()
    }

    fn seeded_service() -> TrendService<Database> {
        let mut db = Database::open_in_memory().unwrap();
        seed::run(&mut db).unwrap();
        TrendService::new(db)
    }

    fn args(start: &str, end: &str, bucket: Option<&str>) -> TrendArgs {
        TrendArgs {
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            bucket: bucket.map(str::to_string),
            json: false,
        }
    }

    fn render(report: &TrendReport, json: bool) -> String {
        let mut out = Vec::new();
        write_report(&mut out, report, json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn products_table() {
        let service = seeded_service();
        let report = query(
            &service,
            ReportKind::Products,
            &args("2025-09-01", "2025-09-04", None),
            now(),
        )
        .unwrap();

        assert_snapshot!(render(&report, false).trim_end(), @r"
        Start       End         Added  Removed  Total
        2025-09-01  2025-09-01      2        0      2
        2025-09-02  2025-09-02      0        0      2
        2025-09-03  2025-09-03      0        1      1
        2025-09-04  2025-09-04      1        0      2
        Current total: 2
        ");
    }

    #[test]
    fn visitors_table() {
        let service = seeded_service();
        let report = query(
            &service,
            ReportKind::Visitors,
            &args("2025-09-01", "2025-09-03", None),
            now(),
        )
        .unwrap();

        assert_snapshot!(render(&report, false).trim_end(), @r"
        Start       End         Visitors
        2025-09-01  2025-09-01         2
        2025-09-02  2025-09-02         1
        2025-09-03  2025-09-03         1
        Total unique visitors: 3
        ");
    }

    #[test]
    fn weekly_visitors_json() {
        let service = seeded_service();
        let report = query(
            &service,
            ReportKind::Visitors,
            &args("2025-09-01", "2025-09-07", Some("week")),
            now(),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&render(&report, true)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "totalVisitors": 3,
                "visitorsByBucket": [
                    { "startDate": "2025-09-01", "endDate": "2025-09-07", "visitors": 3 }
                ]
            })
        );
    }

    #[test]
    fn products_json_field_names() {
        let service = seeded_service();
        let report = query(
            &service,
            ReportKind::Products,
            &args("2025-09-03", "2025-09-03", Some("fortnight")),
            now(),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&render(&report, true)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "currentTotal": 1,
                "trend": [{
                    "startDate": "2025-09-03",
                    "endDate": "2025-09-03",
                    "productsAdded": 0,
                    "productsRemoved": 1,
                    "totalProducts": 1
                }]
            })
        );
    }

    #[test]
    fn invalid_date_is_a_query_error() {
        let service = seeded_service();
        let err = query(
            &service,
            ReportKind::Products,
            &args("not-a-date", "2025-09-04", None),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, TrendError::InvalidDateFormat { field: "startDate", .. }));
    }

    #[test]
    fn json_failure_goes_to_stdout() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = finish(&mut out, &mut err, true, Err(anyhow::anyhow!("db is gone")));

        assert_eq!(code, ExitCode::FAILURE);
        assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r#"{"error":"Internal Server Error"}"#);
        assert!(err.is_empty());
    }

    #[test]
    fn human_failure_goes_to_stderr() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = finish(&mut out, &mut err, false, Err(anyhow::anyhow!("db is gone")));

        assert_eq!(code, ExitCode::FAILURE);
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(err).unwrap(), "Internal Server Error\n");
    }

    #[test]
    fn failure_message_hides_details() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let failure = anyhow::Error::new(TrendError::InvalidDateFormat {
            field: "endDate",
            value: "2025-13-45".to_string(),
        });
        finish(&mut out, &mut err, true, Err(failure));

        let body = String::from_utf8(out).unwrap();
        assert!(!body.contains("2025-13-45"));
    }

    #[test]
    fn success_writes_report_and_exits_zero() {
        let service = seeded_service();
        let report = query(
            &service,
            ReportKind::Visitors,
            &args("2025-09-04", "2025-09-04", None),
            now(),
        );
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = finish(&mut out, &mut err, false, report.map_err(anyhow::Error::from));

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(err.is_empty());
        assert!(String::from_utf8(out).unwrap().ends_with("Total unique visitors: 0\n"));
    }
}
