//! SQLite-backed [`Store`].

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

use super::Store;
use crate::dose::types::{LedgerEntry, Medication, Schedule, Settings};
use crate::error::Result;

/// Storage format for ledger timestamps. Sorts lexicographically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const SETTINGS_KEY: &str = "reminders";

pub struct SqliteStore {
    conn: Connection,
    default_settings: Settings,
}

impl SqliteStore {
    /// Wrap a connection that already has the schema applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            default_settings: Settings::default(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    /// Settings returned while nothing has been saved yet.
    pub fn with_default_settings(mut self, settings: Settings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn load_schedules(&self) -> Result<HashMap<String, Vec<Schedule>>> {
        let mut stmt = self.conn.prepare(
            "SELECT medication_id, id, time, days, dose FROM schedules \
             ORDER BY medication_id, position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let medication_id: String = row.get(0)?;
                let time: String = row.get(2)?;
                let days: String = row.get(3)?;
                Ok((
                    medication_id,
                    Schedule {
                        id: row.get(1)?,
                        time: time.parse().map_err(|e| conversion_error(2, e))?,
                        days: days.parse().map_err(|e| conversion_error(3, e))?,
                        dose: row.get(4)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut by_medication: HashMap<String, Vec<Schedule>> = HashMap::new();
        for (medication_id, schedule) in rows {
            by_medication.entry(medication_id).or_default().push(schedule);
        }
        Ok(by_medication)
    }

    fn query_entries(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(args, entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let taken_at: String = row.get(3)?;
    let status: String = row.get(4)?;
    let scheduled_time: Option<String> = row.get(5)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        medication_id: row.get(1)?,
        medication_name: row.get(2)?,
        taken_at: NaiveDateTime::parse_from_str(&taken_at, TIMESTAMP_FORMAT)
            .map_err(|e| conversion_error(3, e))?,
        status: status.parse().map_err(|e| conversion_error(4, e))?,
        scheduled_time: scheduled_time
            .map(|t| t.parse())
            .transpose()
            .map_err(|e| conversion_error(5, e))?,
    })
}

fn upsert_medication(conn: &Connection, med: &Medication) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO medications (id, name, dose, alarm_enabled, reminder_message, notes, stock, \
         units_per_dose, low_stock_threshold, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, dose = excluded.dose, \
         alarm_enabled = excluded.alarm_enabled, reminder_message = excluded.reminder_message, \
         notes = excluded.notes, stock = excluded.stock, units_per_dose = excluded.units_per_dose, \
         low_stock_threshold = excluded.low_stock_threshold, updated_at = excluded.updated_at",
        params![
            med.id,
            med.name,
            med.dose,
            med.alarm_enabled,
            med.reminder_message,
            med.notes,
            med.stock,
            med.units_per_dose,
            med.low_stock_threshold,
            now,
        ],
    )?;

    conn.execute("DELETE FROM schedules WHERE medication_id = ?1", params![med.id])?;
    for (position, schedule) in med.schedules.iter().enumerate() {
        conn.execute(
            "INSERT INTO schedules (id, medication_id, position, time, days, dose) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                schedule.id,
                med.id,
                position as i64,
                schedule.time.to_string(),
                schedule.days.to_string(),
                schedule.dose,
            ],
        )?;
    }
    Ok(())
}

fn upsert_entry(conn: &Connection, entry: &LedgerEntry) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO ledger_entries \
         (id, medication_id, medication_name, taken_at, status, scheduled_time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id,
            entry.medication_id,
            entry.medication_name,
            entry.taken_at.format(TIMESTAMP_FORMAT).to_string(),
            entry.status.as_str(),
            entry.scheduled_time.map(|t| t.to_string()),
        ],
    )?;
    Ok(())
}

fn day_bounds(from: NaiveDate, to: NaiveDate) -> (String, String) {
    let start = from.format("%Y-%m-%d").to_string();
    // exclusive upper bound: the day after `to`
    let end = to
        .succ_opt()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "9999-99-99".to_string());
    (start, end)
}

impl Store for SqliteStore {
    fn medications(&self) -> Result<Vec<Medication>> {
        let mut schedules = self.load_schedules()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, dose, alarm_enabled, reminder_message, notes, stock, \
             units_per_dose, low_stock_threshold FROM medications ORDER BY created_at, id",
        )?;
        let meds = stmt
            .query_map([], |row| {
                Ok(Medication {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    dose: row.get(2)?,
                    schedules: Vec::new(),
                    alarm_enabled: row.get(3)?,
                    reminder_message: row.get(4)?,
                    notes: row.get(5)?,
                    stock: row.get(6)?,
                    units_per_dose: row.get(7)?,
                    low_stock_threshold: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(meds
            .into_iter()
            .map(|mut m| {
                m.schedules = schedules.remove(&m.id).unwrap_or_default();
                m
            })
            .collect())
    }

    fn medication(&self, id: &str) -> Result<Option<Medication>> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM medications WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }
        Ok(self.medications()?.into_iter().find(|m| m.id == id))
    }

    fn save_medication(&self, medication: &Medication) -> Result<()> {
        medication.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        upsert_medication(&tx, medication)?;
        tx.commit()?;
        Ok(())
    }

    fn save_medications(&self, medications: &[Medication]) -> Result<()> {
        for med in medications {
            med.validate()?;
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM medications", [])?;
        for med in medications {
            upsert_medication(&tx, med)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_medication(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM medications WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        self.query_entries(
            "SELECT id, medication_id, medication_name, taken_at, status, scheduled_time \
             FROM ledger_entries ORDER BY taken_at, id",
            &[],
        )
    }

    fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let (start, end) = day_bounds(from, to);
        self.query_entries(
            "SELECT id, medication_id, medication_name, taken_at, status, scheduled_time \
             FROM ledger_entries WHERE taken_at >= ?1 AND taken_at < ?2 ORDER BY taken_at, id",
            &[&start, &end],
        )
    }

    fn entry(&self, id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self
            .query_entries(
                "SELECT id, medication_id, medication_name, taken_at, status, scheduled_time \
                 FROM ledger_entries WHERE id = ?1",
                &[&id],
            )?
            .into_iter()
            .next())
    }

    fn save_entry(&self, entry: &LedgerEntry) -> Result<()> {
        upsert_entry(&self.conn, entry)
    }

    fn save_entries(&self, entries: &[LedgerEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM ledger_entries", [])?;
        for entry in entries {
            upsert_entry(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_entry(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM ledger_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn settings(&self) -> Result<Settings> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(json) => {
                // merge stored fields over the configured defaults
                let mut merged = serde_json::to_value(self.default_settings)?;
                let overrides: serde_json::Value = serde_json::from_str(&json)?;
                if let (Some(base), Some(over)) = (merged.as_object_mut(), overrides.as_object()) {
                    for (k, v) in over {
                        base.insert(k.clone(), v.clone());
                    }
                }
                Ok(serde_json::from_value(merged)?)
            }
            None => Ok(self.default_settings),
        }
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![SETTINGS_KEY, serde_json::to_string(settings)?],
        )?;
        Ok(())
    }
}
