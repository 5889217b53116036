//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::log_visit::LogVisitArgs;
use crate::commands::trends::TrendArgs;

/// Product and visitor trend dashboard.
///
/// Aggregates inventory changes and site visits into day, week or month
/// buckets and reports running product totals and unique visitors.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show product additions, removals and running totals.
    Products(TrendArgs),

    /// Show unique visitors per bucket and over the range.
    Visitors(TrendArgs),

    /// Record a single site visit.
    LogVisit(LogVisitArgs),

    /// Import products, inventory changes and visits from JSONL on stdin.
    Import,

    /// Load the reference data set into an empty database.
    Seed,

    /// Show database location and contents.
    Status,
}
