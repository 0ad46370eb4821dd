//! Persistence boundary.
//!
//! The engine reads and writes three collections (medications, ledger
//! entries, settings) through the synchronous [`Store`] trait. Nothing is
//! transactional across calls: a confirmation is two independent writes.
//! [`SqliteStore`] is the bundled implementation.

pub mod sqlite;

pub use sqlite::SqliteStore;

use chrono::NaiveDate;

use crate::dose::types::{LedgerEntry, Medication, Settings};
use crate::error::Result;

pub trait Store {
    /// All medications with their schedules, in creation order.
    fn medications(&self) -> Result<Vec<Medication>>;

    fn medication(&self, id: &str) -> Result<Option<Medication>> {
        Ok(self.medications()?.into_iter().find(|m| m.id == id))
    }

    /// Insert or replace one medication and its schedules.
    fn save_medication(&self, medication: &Medication) -> Result<()>;

    /// Replace the whole medication collection.
    fn save_medications(&self, medications: &[Medication]) -> Result<()>;

    /// Returns `false` when no medication had that id.
    fn delete_medication(&self, id: &str) -> Result<bool>;

    /// All ledger entries, oldest first.
    fn entries(&self) -> Result<Vec<LedgerEntry>>;

    /// Entries whose `taken_at` falls on `date`.
    fn entries_on(&self, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        self.entries_between(date, date)
    }

    /// Entries whose `taken_at` date lies in `from..=to`.
    fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| (from..=to).contains(&e.date()))
            .collect())
    }

    fn entry(&self, id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.entries()?.into_iter().find(|e| e.id == id))
    }

    /// Insert or replace one ledger entry.
    fn save_entry(&self, entry: &LedgerEntry) -> Result<()>;

    /// Replace the whole ledger.
    fn save_entries(&self, entries: &[LedgerEntry]) -> Result<()>;

    /// Returns `false` when no entry had that id.
    fn delete_entry(&self, id: &str) -> Result<bool>;

    /// Stored settings merged over defaults.
    fn settings(&self) -> Result<Settings>;

    fn save_settings(&self, settings: &Settings) -> Result<()>;
}
