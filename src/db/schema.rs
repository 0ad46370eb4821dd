//! SQL DDL for all dosewatch tables.
//!
//! Defines `medications`, `schedules`, `ledger_entries`, `settings`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Medication plan
CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    dose TEXT NOT NULL DEFAULT '',
    alarm_enabled INTEGER NOT NULL DEFAULT 1,
    reminder_message TEXT,
    notes TEXT,
    stock INTEGER CHECK(stock IS NULL OR stock >= 0),
    units_per_dose INTEGER CHECK(units_per_dose IS NULL OR units_per_dose >= 0),
    low_stock_threshold INTEGER CHECK(low_stock_threshold IS NULL OR low_stock_threshold >= 0),
    -- single daily time from before weekly schedules existed; cleared by migration v2
    legacy_time TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schedules (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    time TEXT NOT NULL,
    days TEXT NOT NULL,
    dose TEXT
);

CREATE INDEX IF NOT EXISTS idx_schedules_medication ON schedules(medication_id);

-- Adherence ledger. No FK: entries outlive their medication.
CREATE TABLE IF NOT EXISTS ledger_entries (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL,
    medication_name TEXT NOT NULL,
    taken_at TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('taken','skipped')),
    scheduled_time TEXT
);

CREATE INDEX IF NOT EXISTS idx_ledger_taken_at ON ledger_entries(taken_at);
CREATE INDEX IF NOT EXISTS idx_ledger_medication ON ledger_entries(medication_id);

-- User settings, JSON values keyed by section
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["medications", "schedules", "ledger_entries", "settings", "schema_meta"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn negative_stock_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let res = conn.execute(
            "INSERT INTO medications (id, name, stock, created_at, updated_at) VALUES ('m', 'x', -1, '', '')",
            [],
        );
        assert!(res.is_err());
    }
}
