//! Adherence ledger: confirmation records and fulfillment matching.
//!
//! The ledger is the only source of truth for whether a dose was taken.
//! Entries are appended on confirmation or manual entry, changed only by an
//! explicit [`edit`], and removed only by [`delete`]. Neither touches stock.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::types::{DoseObligation, DoseStatus, LedgerEntry, TimeOfDay};
use crate::error::Result;
use crate::store::Store;

/// Result of [`record_taken`].
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub entry: LedgerEntry,
    /// `true` if the slot was already confirmed today and the existing entry was returned.
    pub deduplicated: bool,
}

/// Record a dose as taken now.
///
/// A slot is confirmed at most once per day: if a `taken` entry already
/// exists for the same medication, scheduled time and date, that entry is
/// returned and nothing is written. Entries without a scheduled time are
/// always appended.
pub fn record_taken(
    store: &dyn Store,
    medication_id: &str,
    medication_name: &str,
    scheduled_time: Option<TimeOfDay>,
    now: NaiveDateTime,
) -> Result<RecordOutcome> {
    if let Some(time) = scheduled_time {
        let existing = store.entries_on(now.date())?.into_iter().find(|e| {
            e.is_taken() && e.medication_id == medication_id && e.scheduled_time == Some(time)
        });
        if let Some(entry) = existing {
            tracing::debug!(
                medication_id = %medication_id,
                scheduled_time = %time,
                entry_id = %entry.id,
                "slot already confirmed today"
            );
            return Ok(RecordOutcome {
                entry,
                deduplicated: true,
            });
        }
    }

    let entry = LedgerEntry::new(
        medication_id,
        medication_name,
        now,
        DoseStatus::Taken,
        scheduled_time,
    );
    store.save_entry(&entry)?;
    tracing::info!(
        entry_id = %entry.id,
        medication_id = %medication_id,
        scheduled_time = ?scheduled_time.map(|t| t.to_string()),
        "dose recorded"
    );

    Ok(RecordOutcome {
        entry,
        deduplicated: false,
    })
}

/// Append a manual entry at an arbitrary time. Never deduplicated.
pub fn record_manual(
    store: &dyn Store,
    medication_id: &str,
    medication_name: &str,
    status: DoseStatus,
    taken_at: NaiveDateTime,
    scheduled_time: Option<TimeOfDay>,
) -> Result<LedgerEntry> {
    let entry = LedgerEntry::new(medication_id, medication_name, taken_at, status, scheduled_time);
    store.save_entry(&entry)?;
    tracing::info!(entry_id = %entry.id, status = %status, "manual ledger entry added");
    Ok(entry)
}

/// `true` iff a `taken` entry on the obligation's date names its medication and scheduled time.
pub fn is_fulfilled(obligation: &DoseObligation, entries: &[LedgerEntry]) -> bool {
    entries.iter().any(|e| {
        e.is_taken()
            && e.date() == obligation.date
            && e.medication_id == obligation.medication_id
            && e.scheduled_time == Some(obligation.time)
    })
}

/// Fulfillment of each obligation, index-aligned with `obligations`.
///
/// Explicit matches are applied first. Each `taken` entry without a scheduled
/// time then fulfils the earliest still-unfulfilled obligation of its
/// medication on its date. For medications with several slots a day that
/// assignment is a guess; it is kept for ledgers written before entries
/// carried a scheduled time.
pub fn resolve_fulfillment(obligations: &[DoseObligation], entries: &[LedgerEntry]) -> Vec<bool> {
    let mut fulfilled: Vec<bool> = obligations
        .iter()
        .map(|o| is_fulfilled(o, entries))
        .collect();

    for legacy in entries
        .iter()
        .filter(|e| e.is_taken() && e.scheduled_time.is_none())
    {
        let slot = (0..obligations.len()).find(|&i| {
            !fulfilled[i]
                && obligations[i].medication_id == legacy.medication_id
                && obligations[i].date == legacy.date()
        });
        if let Some(i) = slot {
            fulfilled[i] = true;
        }
    }

    fulfilled
}

/// Change the timestamp and status of an entry. Unknown ids are a logged no-op.
pub fn edit(
    store: &dyn Store,
    id: &str,
    new_taken_at: NaiveDateTime,
    new_status: DoseStatus,
) -> Result<bool> {
    let Some(mut entry) = store.entry(id)? else {
        tracing::warn!(entry_id = %id, "edit of unknown ledger entry ignored");
        return Ok(false);
    };
    entry.taken_at = new_taken_at;
    entry.status = new_status;
    store.save_entry(&entry)?;
    tracing::info!(entry_id = %id, status = %new_status, "ledger entry edited");
    Ok(true)
}

/// Remove an entry. Unknown ids are a logged no-op.
pub fn delete(store: &dyn Store, id: &str) -> Result<bool> {
    let removed = store.delete_entry(id)?;
    if removed {
        tracing::info!(entry_id = %id, "ledger entry deleted");
    } else {
        tracing::warn!(entry_id = %id, "delete of unknown ledger entry ignored");
    }
    Ok(removed)
}

/// The `limit` most recent entries, newest first.
pub fn recent(entries: &[LedgerEntry], limit: usize) -> Vec<LedgerEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.id.cmp(&a.id)));
    sorted.truncate(limit);
    sorted
}

/// Group entries by calendar day, keeping the input order of days and entries.
pub fn group_by_day(entries: &[LedgerEntry]) -> Vec<(NaiveDate, Vec<LedgerEntry>)> {
    let mut groups: Vec<(NaiveDate, Vec<LedgerEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(d, _)| *d == entry.date()) {
            Some((_, group)) => group.push(entry.clone()),
            None => groups.push((entry.date(), vec![entry.clone()])),
        }
    }
    groups
}
