//! Import command for loading products, inventory changes and visits.
//!
//! Input is JSONL on stdin, one record per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"product","id":1,"name":"Desk Lamp","created_at":"2025-09-01T10:00:00Z"}
//! {"kind":"inventory","product_id":1,"action":"added","count":1,"occurred_at":"2025-09-01T10:00:00Z"}
//! {"kind":"visit","session_id":"sess1","occurred_at":"2025-09-01T08:00:00Z"}
//! ```

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use tb_core::SessionId;
use tb_db::{Database, InventoryRecord, ProductRecord, VisitRecord};

/// Rows written by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub products: usize,
    pub inventory_events: usize,
    pub visits: usize,
}

pub fn run(db: &mut Database) -> Result<ImportSummary> {
    let stdin = io::stdin();
    let batch = parse_lines(stdin.lock())?;
    write_batch(db, &batch)
}

/// Records parsed from one input stream, grouped by table.
#[derive(Debug, Default)]
struct ImportBatch {
    products: Vec<ProductRecord>,
    inventory: Vec<InventoryRecord>,
    visits: Vec<VisitRecord>,
}

fn write_batch(db: &mut Database, batch: &ImportBatch) -> Result<ImportSummary> {
    Ok(ImportSummary {
        products: db
            .upsert_products(&batch.products)
            .context("failed to import products")?,
        inventory_events: db
            .insert_inventory_events(&batch.inventory)
            .context("failed to import inventory events")?,
        visits: db
            .insert_visits(&batch.visits)
            .context("failed to import visits")?,
    })
}

fn parse_lines<R: BufRead>(reader: R) -> Result<ImportBatch> {
    let mut batch = ImportBatch::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: ImportLine = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        parsed
            .push_into(&mut batch)
            .with_context(|| format!("invalid record on line {}", idx + 1))?;
    }
    Ok(batch)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ImportLine {
    Product {
        id: i64,
        #[serde(default)]
        name: Option<String>,
        created_at: DateTime<Utc>,
        #[serde(default)]
        deleted_at: Option<DateTime<Utc>>,
    },
    Inventory {
        product_id: i64,
        action: String,
        count: u32,
        occurred_at: DateTime<Utc>,
    },
    Visit {
        #[serde(default)]
        id: Option<String>,
        session_id: SessionId,
        occurred_at: DateTime<Utc>,
        #[serde(default)]
        user_agent: Option<String>,
        #[serde(default)]
        ip: Option<String>,
    },
}

impl ImportLine {
    fn push_into(self, batch: &mut ImportBatch) -> Result<()> {
        match self {
            Self::Product {
                id,
                name,
                created_at,
                deleted_at,
            } => {
                if deleted_at.is_some_and(|deleted_at| deleted_at < created_at) {
                    anyhow::bail!("product {id} deleted before it was created");
                }
                batch.products.push(ProductRecord {
                    id,
                    name,
                    created_at,
                    deleted_at,
                });
            }
            Self::Inventory {
                product_id,
                action,
                count,
                occurred_at,
            } => {
                if action.trim().is_empty() {
                    anyhow::bail!("missing action");
                }
                if count == 0 {
                    anyhow::bail!("count must be positive");
                }
                batch.inventory.push(InventoryRecord {
                    product_id,
                    action,
                    count,
                    occurred_at,
                });
            }
            Self::Visit {
                id,
                session_id,
                occurred_at,
                user_agent,
                ip,
            } => {
                let id = id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                batch.visits.push(VisitRecord {
                    id,
                    session_id: session_id.into(),
                    user_agent,
                    ip,
                    visited_at: occurred_at,
                });
            }
        }
        Ok(())
    }
}
