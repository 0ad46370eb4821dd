#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};

use dosewatch::dose::types::{DoseStatus, LedgerEntry, Medication, Schedule, TimeOfDay, Weekdays};
use dosewatch::error::DoseError;
use dosewatch::notify::{Feedback, Notification, NotificationDispatcher, Permission};
use dosewatch::store::{SqliteStore, Store};

/// Fresh in-memory store with schema and migrations applied.
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

/// Parse `YYYY-MM-DDTHH:MM:SS`.
pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// Parse `YYYY-MM-DD`.
pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn time(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

/// Medication with one schedule per `(time, days)` pair.
pub fn medication(name: &str, slots: &[(&str, Weekdays)]) -> Medication {
    slots.iter().fold(Medication::new(name, "1 tablet"), |med, (t, days)| {
        med.with_schedule(Schedule::new(time(t), *days))
    })
}

/// Medication taken every day at each of `times`.
pub fn daily(name: &str, times: &[&str]) -> Medication {
    let slots: Vec<(&str, Weekdays)> = times.iter().map(|t| (*t, Weekdays::EVERY_DAY)).collect();
    medication(name, &slots)
}

/// A `taken` entry for `med` at `taken_at`, fulfilling slot `slot`.
pub fn taken(med: &Medication, taken_at: &str, slot: Option<&str>) -> LedgerEntry {
    LedgerEntry::new(&med.id, &med.name, at(taken_at), DoseStatus::Taken, slot.map(time))
}

pub fn skipped(med: &Medication, taken_at: &str, slot: Option<&str>) -> LedgerEntry {
    LedgerEntry::new(&med.id, &med.name, at(taken_at), DoseStatus::Skipped, slot.map(time))
}

/// Save `meds` into `store` and return them.
pub fn seed(store: &SqliteStore, meds: Vec<Medication>) -> Vec<Medication> {
    for med in &meds {
        store.save_medication(med).unwrap();
    }
    meds
}

/// Dispatcher that records every notification it accepts.
pub struct RecordingDispatcher {
    pub permission: Cell<Permission>,
    pub fail: Cell<bool>,
    pub sent: RefCell<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            permission: Cell::new(Permission::Granted),
            fail: Cell::new(false),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    fn dispatch(&self, notification: &Notification) -> Result<(), DoseError> {
        if self.fail.get() {
            return Err(DoseError::Dispatch("simulated failure".into()));
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

/// Feedback sink that counts cues.
#[derive(Default)]
pub struct CountingFeedback {
    pub successes: Cell<u32>,
    pub warnings: Cell<u32>,
}

impl Feedback for CountingFeedback {
    fn success(&self) {
        self.successes.set(self.successes.get() + 1);
    }

    fn warning(&self) {
        self.warnings.set(self.warnings.get() + 1);
    }
}
