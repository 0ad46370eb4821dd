//! Dose task aggregation: today's obligations joined with ledger state, and
//! the confirm action that writes to both the ledger and stock.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;

use super::resolver::resolve_for_date;
use super::types::{LedgerEntry, Medication, ObligationKey, Schedule};
use super::{ledger, stock};
use crate::error::{DoseError, Result};
use crate::notify::Feedback;
use crate::store::Store;

/// One scheduled dose of the day and whether it has been taken.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseTask {
    pub medication: Medication,
    pub schedule: Schedule,
    pub date: NaiveDate,
    /// Effective dose for this slot.
    pub dose: String,
    pub is_taken: bool,
}

impl DoseTask {
    pub fn key(&self) -> ObligationKey {
        ObligationKey::new(self.medication.id.clone(), self.schedule.time)
    }
}

/// Tasks for `date`, sorted like [`resolve_for_date`].
pub fn tasks_for_date(
    medications: &[Medication],
    entries: &[LedgerEntry],
    date: NaiveDate,
) -> Vec<DoseTask> {
    let obligations = resolve_for_date(medications, date);
    let fulfilled = ledger::resolve_fulfillment(&obligations, entries);

    obligations
        .into_iter()
        .zip(fulfilled)
        .filter_map(|(obligation, is_taken)| {
            let medication = medications.iter().find(|m| m.id == obligation.medication_id)?;
            let schedule = medication
                .schedules
                .iter()
                .find(|s| s.id == obligation.schedule_id)?;
            Some(DoseTask {
                medication: medication.clone(),
                schedule: schedule.clone(),
                date,
                dose: obligation.dose,
                is_taken,
            })
        })
        .collect()
}

/// Today's tasks from today's ledger entries.
pub fn get_tasks_for_today(
    medications: &[Medication],
    todays_entries: &[LedgerEntry],
    today: NaiveDate,
) -> Vec<DoseTask> {
    tasks_for_date(medications, todays_entries, today)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    Pending,
    Completed,
    All,
}

impl FromStr for TaskFilter {
    type Err = DoseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "all" => Ok(Self::All),
            _ => Err(DoseError::validation(format!("unknown task filter: {s}"))),
        }
    }
}

pub fn filter_tasks(tasks: &[DoseTask], filter: TaskFilter) -> Vec<&DoseTask> {
    tasks
        .iter()
        .filter(|t| match filter {
            TaskFilter::Pending => !t.is_taken,
            TaskFilter::Completed => t.is_taken,
            TaskFilter::All => true,
        })
        .collect()
}

/// Percentage of today's tasks taken, rounded; 100 when nothing is scheduled.
pub fn progress(tasks: &[DoseTask]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 100;
    }
    let taken = tasks.iter().filter(|t| t.is_taken).count();
    ((taken * 100 + total / 2) / total) as u8
}

/// First pending task in schedule order.
pub fn next_task(tasks: &[DoseTask]) -> Option<&DoseTask> {
    tasks.iter().find(|t| !t.is_taken)
}

/// Result of a confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub entry: LedgerEntry,
    /// Slot was already confirmed today; neither ledger nor stock changed.
    pub deduplicated: bool,
    /// Stock after the decrement, if tracked.
    pub stock: Option<u32>,
    pub low_stock: bool,
}

/// Serializes confirmations per obligation key.
#[derive(Debug, Default)]
pub struct TaskConfirmer {
    in_flight: Mutex<HashSet<ObligationKey>>,
}

/// Marks a key as being confirmed until dropped.
pub struct ConfirmTicket<'a> {
    confirmer: &'a TaskConfirmer,
    key: ObligationKey,
}

impl Drop for ConfirmTicket<'_> {
    fn drop(&mut self) {
        self.confirmer
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

impl TaskConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, key: &ObligationKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    /// Claim `key`. Hosts that show a delay before committing hold the ticket
    /// for the duration; [`confirm`](Self::confirm) claims it itself otherwise.
    pub fn begin(&self, key: ObligationKey) -> Result<ConfirmTicket<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            return Err(DoseError::ConfirmInFlight(key.to_string()));
        }
        Ok(ConfirmTicket {
            confirmer: self,
            key,
        })
    }

    /// Confirm a task: append to the ledger, then decrement stock if tracked.
    ///
    /// The two writes are independent. If the ledger write fails the task
    /// stays pending and nothing else happens.
    pub fn confirm(
        &self,
        store: &dyn Store,
        task: &DoseTask,
        now: NaiveDateTime,
        feedback: &dyn Feedback,
    ) -> Result<ConfirmOutcome> {
        let _ticket = self.begin(task.key())?;
        self.commit(store, task, now, feedback)
    }

    /// Confirm with a ticket obtained earlier from [`begin`](Self::begin).
    pub fn confirm_with_ticket(
        &self,
        ticket: ConfirmTicket<'_>,
        store: &dyn Store,
        task: &DoseTask,
        now: NaiveDateTime,
        feedback: &dyn Feedback,
    ) -> Result<ConfirmOutcome> {
        if ticket.key != task.key() {
            return Err(DoseError::validation(format!(
                "ticket for {} used to confirm {}",
                ticket.key,
                task.key()
            )));
        }
        self.commit(store, task, now, feedback)
    }

    /// Confirm today's task identified by `key`, reading state from the store.
    pub fn confirm_key(
        &self,
        store: &dyn Store,
        key: &ObligationKey,
        now: NaiveDateTime,
        feedback: &dyn Feedback,
    ) -> Result<ConfirmOutcome> {
        self.confirm_key_on(store, key, now.date(), now, feedback)
    }

    /// Confirm the task identified by `key` on `date`. A pre-reminder sent
    /// before midnight is confirmed against the next day this way.
    pub fn confirm_key_on(
        &self,
        store: &dyn Store,
        key: &ObligationKey,
        date: NaiveDate,
        now: NaiveDateTime,
        feedback: &dyn Feedback,
    ) -> Result<ConfirmOutcome> {
        let medications = store.medications()?;
        let entries = store.entries_on(date)?;
        let tasks = tasks_for_date(&medications, &entries, date);
        let task = tasks
            .iter()
            .find(|t| &t.key() == key)
            .ok_or_else(|| DoseError::NotFound {
                kind: "dose",
                id: format!("{key} on {date}"),
            })?;
        self.confirm(store, task, now, feedback)
    }

    fn commit(
        &self,
        store: &dyn Store,
        task: &DoseTask,
        now: NaiveDateTime,
        feedback: &dyn Feedback,
    ) -> Result<ConfirmOutcome> {
        feedback.tick();
        let medication = &task.medication;
        let taken_at = stamp_within(task.date, now);
        if taken_at != now {
            tracing::debug!(key = %task.key(), date = %task.date, %taken_at, "confirmation stamped on the obligation's date");
        }
        let recorded = match ledger::record_taken(
            store,
            &medication.id,
            &medication.name,
            Some(task.schedule.time),
            taken_at,
        ) {
            Ok(recorded) => recorded,
            Err(e) => {
                tracing::warn!(key = %task.key(), error = %e, "confirmation failed");
                feedback.warning();
                return Err(e);
            }
        };

        let mut outcome = ConfirmOutcome {
            entry: recorded.entry,
            deduplicated: recorded.deduplicated,
            stock: None,
            low_stock: false,
        };

        if !outcome.deduplicated && medication.tracks_stock() {
            outcome.stock =
                stock::decrement(store, &medication.id, medication.effective_units_per_dose())?;
            outcome.low_stock = outcome
                .stock
                .is_some_and(|s| s <= medication.effective_low_stock_threshold());
        }

        feedback.success();
        if outcome.low_stock {
            tracing::warn!(
                medication_id = %medication.id,
                stock = ?outcome.stock,
                "stock running low"
            );
            feedback.warning();
        }

        Ok(outcome)
    }
}

/// `now`, moved into `date` when it falls on another day. The ledger
/// attributes an entry to the date of its timestamp, so a dose confirmed
/// at 23:56 for tomorrow's 00:05 slot is stamped at tomorrow's first
/// second, and a late confirmation after midnight at the day's last.
fn stamp_within(date: NaiveDate, now: NaiveDateTime) -> NaiveDateTime {
    match date.cmp(&now.date()) {
        Ordering::Equal => now,
        Ordering::Greater => date.and_time(NaiveTime::MIN),
        Ordering::Less => date.and_hms_opt(23, 59, 59).unwrap_or(now),
    }
}
