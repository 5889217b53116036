//! Storage layer for the trend dashboard.
//!
//! Provides persistence for products, inventory changes and visits using
//! `rusqlite`, and implements [`tb_core::EventStore`] on top of it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Each CLI invocation opens its own connection; share one across threads only
//! behind a `Mutex`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with millisecond precision
//! (e.g., `2025-09-01T10:00:00.000Z`). Every write goes through
//! [`format_timestamp`], so the text always has the same width and
//! lexicographic ordering matches chronological ordering.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use tb_core::{EventStore, InventoryEvent, SessionId, StoreError, VisitEvent};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp in {table} row {row_id}: {timestamp}")]
    TimestampParse {
        table: &'static str,
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates the data model.
    #[error("invalid data in {table} row {row_id}: {message}")]
    InvalidEventData {
        table: &'static str,
        row_id: String,
        message: String,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::new(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A product as stored in the `products` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: i64,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the product was removed (soft delete).
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A row of the `product_trends` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub product_id: i64,
    pub action: String,
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// A row of the `visitor_logs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub id: String,
    pub session_id: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub visited_at: DateTime<Utc>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub products: i64,
    pub inventory_events: i64,
    pub visits: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                name TEXT,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_products_created ON products(created_at);

            -- Inventory changes: action is 'added' or 'removed'
            CREATE TABLE IF NOT EXISTS product_trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                count INTEGER NOT NULL,
                trend_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_product_trends_date ON product_trends(trend_date);

            CREATE TABLE IF NOT EXISTS visitor_logs (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_agent TEXT,
                ip TEXT,
                visit_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_visitor_logs_date ON visitor_logs(visit_date);
            CREATE INDEX IF NOT EXISTS idx_visitor_logs_session ON visitor_logs(session_id);
            ",
        )?;
        Ok(())
    }

    /// Inserts or updates products by ID.
    pub fn upsert_products(&mut self, products: &[ProductRecord]) -> Result<usize, DbError> {
        if products.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO products (id, name, created_at, deleted_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = COALESCE(excluded.name, products.name),
                    created_at = excluded.created_at,
                    deleted_at = excluded.deleted_at
                ",
            )?;
            for product in products {
                written += stmt.execute(params![
                    product.id,
                    product.name,
                    format_timestamp(product.created_at),
                    product.deleted_at.map(format_timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Appends inventory change events.
    pub fn insert_inventory_events(&mut self, events: &[InventoryRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO product_trends (product_id, action, count, trend_date)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    event.product_id,
                    event.action,
                    event.count,
                    format_timestamp(event.occurred_at),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, "inserted inventory events");
        Ok(inserted)
    }

    /// Inserts visits, ignoring duplicates by ID.
    pub fn insert_visits(&mut self, visits: &[VisitRecord]) -> Result<usize, DbError> {
        if visits.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO visitor_logs (id, session_id, user_agent, ip, visit_date)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for visit in visits {
                inserted += stmt.execute(params![
                    visit.id,
                    visit.session_id,
                    visit.user_agent,
                    visit.ip,
                    format_timestamp(visit.visited_at),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, skipped = visits.len() - inserted, "inserted visits");
        Ok(inserted)
    }

    /// Lists inventory changes within a time range.
    ///
    /// The range is inclusive of both `start` and `end`.
    pub fn list_inventory_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<InventoryEvent>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, product_id, action, count, trend_date
            FROM product_trends
            WHERE trend_date >= ? AND trend_date <= ?
            ORDER BY trend_date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (id, product_id, action, count, trend_date) = row?;
            let row_id = id.to_string();
            let count = u32::try_from(count).map_err(|_| DbError::InvalidEventData {
                table: "product_trends",
                row_id: row_id.clone(),
                message: format!("count out of range: {count}"),
            })?;
            events.push(InventoryEvent {
                entity_id: product_id,
                action,
                count,
                occurred_at: parse_timestamp(&trend_date, "product_trends", &row_id)?,
            });
        }
        Ok(events)
    }

    /// Lists visits within a time range.
    ///
    /// The range is inclusive of both `start` and `end`.
    pub fn list_visits_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitEvent>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, session_id, visit_date
            FROM visitor_logs
            WHERE visit_date >= ? AND visit_date <= ?
            ORDER BY visit_date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut visits = Vec::new();
        for row in rows {
            let (id, session_id, visit_date) = row?;
            let session_id = SessionId::new(session_id).map_err(|err| DbError::InvalidEventData {
                table: "visitor_logs",
                row_id: id.clone(),
                message: err.to_string(),
            })?;
            let occurred_at = parse_timestamp(&visit_date, "visitor_logs", &id)?;
            visits.push(VisitEvent::new(session_id, occurred_at));
        }
        Ok(visits)
    }

    /// Counts products that existed just before `instant`.
    ///
    /// A product counts when it was created strictly before `instant` and was
    /// not deleted before `instant`.
    pub fn count_products_active_before(&self, instant: DateTime<Utc>) -> Result<i64, DbError> {
        let instant = format_timestamp(instant);
        let count = self.conn.query_row(
            "
            SELECT COUNT(*)
            FROM products
            WHERE created_at < ?1
              AND (deleted_at IS NULL OR deleted_at >= ?1)
            ",
            [instant],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Row counts for every table.
    pub fn table_counts(&self) -> Result<TableCounts, DbError> {
        let count = |table: &str| -> Result<i64, DbError> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };
        Ok(TableCounts {
            products: count("products")?,
            inventory_events: count("product_trends")?,
            visits: count("visitor_logs")?,
        })
    }

    /// Timestamp of the most recent visit, if any.
    pub fn last_visit_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let last: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, visit_date FROM visitor_logs ORDER BY visit_date DESC, id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        last.map(|(id, visit_date)| parse_timestamp(&visit_date, "visitor_logs", &id))
            .transpose()
    }

    /// Timestamp of the most recent inventory change, if any.
    pub fn last_inventory_event_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let last: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, trend_date FROM product_trends ORDER BY trend_date DESC, id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        last.map(|(id, trend_date)| {
            parse_timestamp(&trend_date, "product_trends", &id.to_string())
        })
        .transpose()
    }
}

impl EventStore for Database {
    fn inventory_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<InventoryEvent>, StoreError> {
        Ok(self.list_inventory_events_in_range(start, end)?)
    }

    fn visit_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitEvent>, StoreError> {
        Ok(self.list_visits_in_range(start, end)?)
    }

    fn count_active_before(&self, instant: DateTime<Utc>) -> Result<i64, StoreError> {
        Ok(self.count_products_active_before(instant)?)
    }
}

fn parse_timestamp(timestamp: &str, table: &'static str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

/// Formats a timestamp the way every column stores it.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
