//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::{params, Connection};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.unchecked_transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: turn single-time legacy medications into a weekly
/// schedule running every day.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    let legacy: Vec<(String, String)> = conn
        .prepare(
            "SELECT m.id, m.legacy_time FROM medications m \
             WHERE m.legacy_time IS NOT NULL \
             AND NOT EXISTS (SELECT 1 FROM schedules s WHERE s.medication_id = m.id)",
        )?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (medication_id, time) in &legacy {
        let Ok(parsed) = time.parse::<crate::dose::types::TimeOfDay>() else {
            tracing::warn!(medication_id = %medication_id, time = %time, "skipping unparseable legacy time");
            continue;
        };
        conn.execute(
            "INSERT INTO schedules (id, medication_id, position, time, days, dose) \
             VALUES (?1, ?2, 0, ?3, '0,1,2,3,4,5,6', NULL)",
            params![uuid::Uuid::now_v7().to_string(), medication_id, parsed.to_string()],
        )?;
    }

    conn.execute(
        "UPDATE medications SET legacy_time = NULL \
         WHERE id IN (SELECT medication_id FROM schedules)",
        [],
    )?;

    tracing::info!(converted = legacy.len(), "legacy medication times migrated");
    Ok(())
}
