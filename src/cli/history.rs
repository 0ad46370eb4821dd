//! CLI history commands: recent entries, manual log, edit and delete.

use anyhow::{Context, Result};

use crate::config::DoseConfig;
use crate::dose::ledger;
use crate::dose::types::{DoseStatus, LedgerEntry, TimeOfDay};
use crate::error::DoseError;
use crate::store::Store;

/// Number of entries `history` shows unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Print the most recent ledger entries, grouped by day.
pub fn history(config: &DoseConfig, limit: usize) -> Result<()> {
    let store = super::open_store(config)?;
    let entries = ledger::recent(&store.entries()?, limit);

    if entries.is_empty() {
        println!("No doses recorded yet.");
        return Ok(());
    }

    for (day, group) in ledger::group_by_day(&entries) {
        println!("{}", day.format("%A %Y-%m-%d"));
        for entry in &group {
            print_entry(entry);
        }
        println!();
    }
    Ok(())
}

fn print_entry(entry: &LedgerEntry) {
    let slot = entry
        .scheduled_time
        .map(|t| format!(" (slot {t})"))
        .unwrap_or_default();
    println!(
        "  {}  {:<8} {:<20}{slot}  {}",
        entry.taken_at.format("%H:%M"),
        entry.status,
        entry.medication_name,
        entry.id
    );
}

/// Add a manual entry for a medication.
pub fn log(
    config: &DoseConfig,
    medication_id: &str,
    status: DoseStatus,
    at: &str,
    scheduled_time: Option<&str>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let medication = store
        .medication(medication_id)?
        .ok_or_else(|| DoseError::medication_not_found(medication_id))?;
    let taken_at = super::parse_datetime(at)?;
    let scheduled_time = scheduled_time
        .map(str::parse::<TimeOfDay>)
        .transpose()?;

    let entry = ledger::record_manual(
        &store,
        &medication.id,
        &medication.name,
        status,
        taken_at,
        scheduled_time,
    )?;
    println!("Logged:");
    print_entry(&entry);
    Ok(())
}

/// Change an entry's timestamp and status. Fields not given keep their value.
pub fn edit(config: &DoseConfig, id: &str, at: Option<&str>, status: Option<DoseStatus>) -> Result<()> {
    let store = super::open_store(config)?;
    let Some(current) = store.entry(id)? else {
        println!("No entry with id {id}.");
        return Ok(());
    };

    let taken_at = match at {
        Some(at) => super::parse_datetime(at)?,
        None => current.taken_at,
    };
    let status = status.unwrap_or(current.status);

    let changed = ledger::edit(&store, id, taken_at, status)
        .with_context(|| format!("failed to edit entry {id}"))?;
    if changed {
        println!("Entry {id} updated. Stock was not adjusted.");
    }
    Ok(())
}

pub fn delete(config: &DoseConfig, id: &str) -> Result<()> {
    let store = super::open_store(config)?;
    if ledger::delete(&store, id)? {
        println!("Entry {id} deleted. Stock was not adjusted.");
    } else {
        println!("No entry with id {id}.");
    }
    Ok(())
}
