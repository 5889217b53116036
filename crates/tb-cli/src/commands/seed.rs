//! Seed command for loading the reference data set.
//!
//! The data covers 2025-09-01 through 2025-09-04: three products (one removed
//! on the 3rd), their inventory changes, and four visits from three sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use tb_core::InventoryAction;
use tb_db::{Database, InventoryRecord, ProductRecord, VisitRecord};

/// What the seed command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded {
        products: usize,
        inventory_events: usize,
        visits: usize,
    },
    /// The database already had rows, so nothing was written.
    AlreadyPopulated,
}

pub fn run(db: &mut Database) -> Result<SeedOutcome> {
    let counts = db.table_counts()?;
    if counts.products > 0 || counts.inventory_events > 0 || counts.visits > 0 {
        tracing::debug!(?counts, "database not empty, skipping seed");
        return Ok(SeedOutcome::AlreadyPopulated);
    }

    let products = db.upsert_products(&seed_products()?)?;
    let inventory_events = db.insert_inventory_events(&seed_inventory()?)?;
    let visits = db.insert_visits(&seed_visits()?)?;
    Ok(SeedOutcome::Seeded {
        products,
        inventory_events,
        visits,
    })
}

fn sept(day: u32, hour: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(2025, 9, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid seed timestamp: 2025-09-{day:02} {hour:02}:00"))
}

fn seed_products() -> Result<Vec<ProductRecord>> {
    Ok(vec![
        ProductRecord {
            id: 1,
            name: Some("Desk Lamp".to_string()),
            created_at: sept(1, 10)?,
            deleted_at: Some(sept(3, 9)?),
        },
        ProductRecord {
            id: 2,
            name: Some("Notebook".to_string()),
            created_at: sept(1, 11)?,
            deleted_at: None,
        },
        ProductRecord {
            id: 3,
            name: Some("Water Bottle".to_string()),
            created_at: sept(4, 12)?,
            deleted_at: None,
        },
    ])
}

fn seed_inventory() -> Result<Vec<InventoryRecord>> {
    [
        (1, InventoryAction::Added, (1, 10)),
        (2, InventoryAction::Added, (1, 11)),
        (1, InventoryAction::Removed, (3, 9)),
        (3, InventoryAction::Added, (4, 12)),
    ]
    .into_iter()
    .map(|(product_id, action, (day, hour))| {
        Ok::<_, anyhow::Error>(InventoryRecord {
            product_id,
            action: action.as_str().to_string(),
            count: 1,
            occurred_at: sept(day, hour)?,
        })
    })
    .collect()
}

fn seed_visits() -> Result<Vec<VisitRecord>> {
    [
        ("sess1", "192.168.1.1", (1, 8)),
        ("sess2", "192.168.1.2", (1, 9)),
        ("sess1", "192.168.1.1", (2, 14)),
        ("sess3", "192.168.1.3", (3, 10)),
    ]
    .into_iter()
    .enumerate()
    .map(|(idx, (session_id, ip, (day, hour)))| {
        Ok::<_, anyhow::Error>(VisitRecord {
            id: format!("seed-visit-{}", idx + 1),
            session_id: session_id.to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            ip: Some(ip.to_string()),
            visited_at: sept(day, hour)?,
        })
    })
    .collect()
}
