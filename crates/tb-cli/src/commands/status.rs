//! Status command for showing what the database holds.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use tb_db::{Database, format_timestamp};

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let counts = db.table_counts()?;
    let latest = db.last_visit_at()?.max(db.last_inventory_event_at()?);

    writeln!(writer, "Trendboard status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Products: {}", counts.products)?;
    writeln!(writer, "Inventory events: {}", counts.inventory_events)?;
    writeln!(writer, "Visits: {}", counts.visits)?;

    match latest {
        Some(at) => writeln!(writer, "Latest event: {}", format_timestamp(at))?,
        None => writeln!(writer, "No events recorded.")?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::seed;

    #[test]
    fn status_of_seeded_database() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("tb.db");
        let mut db = Database::open(&db_path).unwrap();
        seed::run(&mut db).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &db_path).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/tb.db");
        assert_snapshot!(output.trim_end(), @r"
        Trendboard status
        Database: [TEMP]/tb.db
        Products: 3
        Inventory events: 4
        Visits: 4
        Latest event: 2025-09-04T12:00:00.000Z
        ");
    }

    #[test]
    fn status_of_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, Path::new(":memory:")).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Visits: 0\n"));
        assert!(output.ends_with("No events recorded.\n"));
    }
}
