//! Import medications, ledger entries and settings from JSON.
//!
//! Accepts the `export` format as well as the older layout: medications
//! with a single `time` and no schedules, a `logs` array instead of
//! `entries`, and UTC `takenAt` timestamps.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::config::DoseConfig;
use crate::dose::types::{
    DoseStatus, LedgerEntry, Medication, Schedule, Settings, TimeOfDay, Weekdays, DEFAULT_DOSE,
};
use crate::error::DoseError;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub medications: Vec<ImportedMedication>,
    #[serde(default, alias = "logs")]
    pub entries: Vec<ImportedEntry>,
    /// Kept as raw JSON so that fields the file leaves out keep their stored values.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ImportedMedication {
    #[serde(flatten)]
    pub medication: Medication,
    /// Single daily time from before medications had schedules.
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedEntry {
    pub id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub taken_at: String,
    pub status: DoseStatus,
    #[serde(default)]
    pub scheduled_time: Option<TimeOfDay>,
}

/// Counts reported by [`apply_import`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub medications_imported: usize,
    pub medications_skipped: usize,
    pub entries_imported: usize,
    pub entries_skipped: usize,
    pub settings_imported: bool,
}

/// Parse a timestamp into wall-clock time in `tz`. RFC 3339 values with an
/// offset are converted; values without one are taken as already local.
pub fn parse_timestamp_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(tz).naive_local());
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    parse_timestamp_in(input, &Local)
}

/// Turn an imported record into a medication, upgrading the legacy single
/// `time` into one schedule on every day.
pub fn normalize_medication(imported: ImportedMedication) -> crate::error::Result<Medication> {
    let mut medication = imported.medication;
    if medication.schedules.is_empty() {
        if let Some(time) = imported.time.as_deref() {
            let time: TimeOfDay = time.parse()?;
            medication.schedules.push(Schedule::new(time, Weekdays::EVERY_DAY));
        }
    }
    if medication.dose.trim().is_empty() {
        medication.dose = DEFAULT_DOSE.to_string();
    }
    medication.validate()?;
    Ok(medication)
}

/// Overlay the fields present in `partial` on `current`.
pub fn merge_settings(current: &Settings, partial: &serde_json::Value) -> crate::error::Result<Settings> {
    let serde_json::Value::Object(fields) = partial else {
        return Err(DoseError::validation("settings must be a JSON object"));
    };
    let mut merged = serde_json::to_value(current)?;
    if let serde_json::Value::Object(ref mut target) = merged {
        for (name, value) in fields {
            let name = if name == "snoozeDuration" { "snoozeMinutes" } else { name.as_str() };
            target.insert(name.to_string(), value.clone());
        }
    }
    Ok(serde_json::from_value(merged)?)
}

/// Write imported data into `store`. Records whose id already exists, in the
/// store or earlier in the same file, are skipped, as are records that fail
/// validation. `tz` is the zone used for timestamps carrying an offset.
pub fn apply_import<Tz: TimeZone>(
    store: &dyn Store,
    data: ImportData,
    tz: &Tz,
) -> crate::error::Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    let mut seen: HashSet<String> = store.medications()?.into_iter().map(|m| m.id).collect();
    for imported in data.medications {
        let id = imported.medication.id.clone();
        if seen.contains(&id) {
            summary.medications_skipped += 1;
            continue;
        }
        match normalize_medication(imported) {
            Ok(medication) => {
                store.save_medication(&medication)?;
                seen.insert(id);
                summary.medications_imported += 1;
            }
            Err(e) => {
                tracing::warn!(medication_id = %id, error = %e, "skipping medication");
                summary.medications_skipped += 1;
            }
        }
    }

    let mut seen: HashSet<String> = store.entries()?.into_iter().map(|e| e.id).collect();
    for imported in data.entries {
        if !seen.insert(imported.id.clone()) {
            tracing::warn!(entry_id = %imported.id, "skipping entry with duplicate id");
            summary.entries_skipped += 1;
            continue;
        }
        let Some(taken_at) = parse_timestamp_in(&imported.taken_at, tz) else {
            tracing::warn!(entry_id = %imported.id, taken_at = %imported.taken_at, "skipping entry with unreadable timestamp");
            summary.entries_skipped += 1;
            continue;
        };
        let entry = LedgerEntry {
            id: imported.id,
            medication_id: imported.medication_id,
            medication_name: imported.medication_name,
            taken_at,
            status: imported.status,
            scheduled_time: imported.scheduled_time,
        };
        store.save_entry(&entry)?;
        summary.entries_imported += 1;
    }

    if let Some(partial) = data.settings {
        let saved = merge_settings(&store.settings()?, &partial)
            .and_then(|settings| store.save_settings(&settings));
        match saved {
            Ok(()) => summary.settings_imported = true,
            Err(e) => tracing::warn!(error = %e, "skipping invalid settings"),
        }
    }

    Ok(summary)
}

/// Import from a JSON file.
pub fn import(config: &DoseConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let data: ImportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let store = super::open_store(config)?;

    println!(
        "Importing {} medications and {} ledger entries...",
        data.medications.len(),
        data.entries.len()
    );

    let summary = apply_import(&store, data, &Local)?;

    println!("Import complete:");
    println!("  Medications imported: {}", summary.medications_imported);
    println!("  Medications skipped:  {}", summary.medications_skipped);
    println!("  Entries imported:     {}", summary.entries_imported);
    println!("  Entries skipped:      {}", summary.entries_skipped);
    if summary.settings_imported {
        println!("  Settings merged");
    }

    Ok(())
}
