//! Visit logging.
//!
//! Logging a visit is best-effort: a storage failure is reported as a warning
//! and never fails the command.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;

use tb_db::{Database, VisitRecord};

use crate::open_database;

#[derive(Debug, Clone, Default, Args)]
pub struct LogVisitArgs {
    /// Session identifier. Derived from the IP and time when omitted.
    #[arg(long)]
    pub session: Option<String>,

    /// User agent of the visitor.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// IP address of the visitor.
    #[arg(long)]
    pub ip: Option<String>,
}

/// Records one visit. Returns whether it was stored.
pub fn run(args: &LogVisitArgs, config_path: Option<&Path>) -> bool {
    let record = visit_record(args, Utc::now());
    let stored = open_database(config_path).and_then(|(mut db, _config)| store(&mut db, &record));
    match stored {
        Ok(()) => {
            tracing::debug!(id = %record.id, session_id = %record.session_id, "visit logged");
            true
        }
        Err(err) => {
            tracing::warn!(error = format!("{err:#}"), "failed to log visit");
            false
        }
    }
}

fn store(db: &mut Database, record: &VisitRecord) -> Result<()> {
    db.insert_visits(std::slice::from_ref(record))?;
    Ok(())
}

/// Builds the visit row for `args` at `now`.
///
/// Without an explicit session, the session is `<ip>-<timestamp>`, with
/// `unknown` standing in for a missing IP.
fn visit_record(args: &LogVisitArgs, now: DateTime<Utc>) -> VisitRecord {
    let ip = non_blank(args.ip.as_deref());
    let session_id = non_blank(args.session.as_deref()).map_or_else(
        || {
            format!(
                "{}-{}",
                ip.unwrap_or("unknown"),
                now.to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        },
        str::to_string,
    );

    VisitRecord {
        id: uuid::Uuid::new_v4().to_string(),
        session_id,
        user_agent: non_blank(args.user_agent.as_deref()).map(str::to_string),
        ip: ip.map(str::to_string),
        visited_at: now,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
