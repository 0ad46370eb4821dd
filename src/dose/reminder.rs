//! Reminder clock: decides, minute by minute, which doses to notify.
//!
//! [`on_tick`] is a pure function of the current time, settings, plan,
//! ledger and the prior [`SchedulerState`]. It returns the reminders that are
//! due and the next state. [`ReminderClock`] wraps it with a dispatcher: it
//! emits one notification per tick and records fired keys only after the
//! dispatcher accepted the notification.
//!
//! Per obligation key the lifecycle is idle → due → notified → (snoozed →
//! due) → fulfilled. Fulfillment is recomputed from the ledger on every tick;
//! a `taken` entry silences the slot for the rest of that date. A missed tick
//! is a missed reminder, never replayed.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::ledger::resolve_fulfillment;
use super::resolver::resolve_for_date;
use super::types::{DoseObligation, LedgerEntry, Medication, ObligationKey, Settings};
use crate::error::DoseError;
use crate::notify::{
    Notification, NotificationAction, NotificationDispatcher, Permission, ACTION_CONFIRM,
    ACTION_SNOOZE,
};

/// Why a reminder fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The notify-target minute was reached.
    Scheduled,
    /// A snooze ran out.
    SnoozeElapsed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReminder {
    pub obligation: DoseObligation,
    /// The evaluation minute this reminder belongs to.
    pub minute: NaiveDateTime,
    pub trigger: Trigger,
    pub lead_minutes: u32,
}

impl DueReminder {
    pub fn key(&self) -> ObligationKey {
        self.obligation.key()
    }
}

/// Process-local reminder state: active snoozes and the dedup guard.
/// Never persisted; a restart forgets both.
///
/// Snoozes belong to one obligation date, so snoozing tomorrow's 00:05
/// pre-reminder at 23:55 leaves this morning's 00:05 slot alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerState {
    snoozed: HashMap<(ObligationKey, NaiveDate), NaiveDateTime>,
    fired: HashSet<(ObligationKey, NaiveDateTime)>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress `key` on `date` until `now + minutes`. Returns the resume time.
    pub fn snooze(
        &mut self,
        key: ObligationKey,
        date: NaiveDate,
        now: NaiveDateTime,
        minutes: u32,
    ) -> NaiveDateTime {
        let resume = now + Duration::minutes(i64::from(minutes));
        self.snoozed.insert((key, date), resume);
        resume
    }

    pub fn snoozed_until(&self, key: &ObligationKey, date: NaiveDate) -> Option<NaiveDateTime> {
        self.snoozed.get(&(key.clone(), date)).copied()
    }

    pub fn is_snoozed(&self, key: &ObligationKey, date: NaiveDate, now: NaiveDateTime) -> bool {
        self.snoozed_until(key, date).is_some_and(|resume| now < resume)
    }

    pub fn has_fired(&self, key: &ObligationKey, minute: NaiveDateTime) -> bool {
        self.fired.contains(&(key.clone(), truncate_to_minute(minute)))
    }

    /// Mark reminders as emitted. A reminder fired after its snooze ran out
    /// also ends that snooze.
    pub fn record_fired(&mut self, due: &[DueReminder]) {
        for reminder in due {
            let key = reminder.key();
            if reminder.trigger == Trigger::SnoozeElapsed {
                self.snoozed.remove(&(key.clone(), reminder.obligation.date));
            }
            self.fired.insert((key, reminder.minute));
        }
    }

    /// Drop guard entries from earlier minutes and snoozes whose resume
    /// window has passed.
    fn pruned(&self, now: NaiveDateTime, window: Duration) -> Self {
        let minute = truncate_to_minute(now);
        Self {
            snoozed: self
                .snoozed
                .iter()
                .filter(|(_, resume)| now < **resume + window)
                .map(|(k, r)| (k.clone(), *r))
                .collect(),
            fired: self
                .fired
                .iter()
                .filter(|(_, m)| *m >= minute)
                .cloned()
                .collect(),
        }
    }
}

pub fn truncate_to_minute(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(datetime)
}

/// Scheduled time minus the pre-reminder lead. May fall on the previous day.
pub fn notify_target(obligation: &DoseObligation, lead_minutes: u32) -> NaiveDateTime {
    obligation.due_at() - Duration::minutes(i64::from(lead_minutes))
}

/// Evaluate one tick.
///
/// An obligation is due when its alarm and global notifications are on, it
/// is not fulfilled, it is not snoozed, it has not fired in this minute, and
/// either its snooze for that date ran out within the last `window` or the
/// current minute equals its notify target. An elapsed snooze fires even
/// before the target. Tomorrow's obligations are considered too, so a lead
/// time can reach across midnight.
pub fn on_tick(
    now: NaiveDateTime,
    settings: &Settings,
    medications: &[Medication],
    entries: &[LedgerEntry],
    prior: &SchedulerState,
    window: Duration,
) -> (Vec<DueReminder>, SchedulerState) {
    let state = prior.pruned(now, window);
    if !settings.notifications_enabled {
        return (Vec::new(), state);
    }

    let minute = truncate_to_minute(now);
    let lead = settings.remind_before_minutes;
    let today = now.date();

    let mut candidates = resolve_for_date(medications, today);
    if let Some(tomorrow) = today.succ_opt() {
        candidates.extend(resolve_for_date(medications, tomorrow));
    }
    let fulfilled = resolve_fulfillment(&candidates, entries);

    let mut due = Vec::new();
    let mut batched: HashSet<ObligationKey> = HashSet::new();

    for (obligation, done) in candidates.into_iter().zip(fulfilled) {
        if done || !obligation.alarm_enabled {
            continue;
        }
        let key = obligation.key();
        if state.has_fired(&key, minute) {
            continue;
        }

        let snooze = state.snoozed_until(&key, obligation.date);
        if snooze.is_some_and(|resume| now < resume) {
            continue;
        }

        let target = notify_target(&obligation, lead);
        let trigger = if snooze.is_some_and(|resume| now < resume + window) {
            Trigger::SnoozeElapsed
        } else if truncate_to_minute(target) == minute {
            Trigger::Scheduled
        } else {
            continue;
        };

        if !batched.insert(key) {
            continue;
        }
        due.push(DueReminder {
            obligation,
            minute,
            trigger,
            lead_minutes: lead,
        });
    }

    (due, state)
}

/// One notification for the whole batch: a single reminder gets confirm and
/// snooze actions, several are grouped into one list without actions.
pub fn build_notification(due: &[DueReminder], settings: &Settings) -> Option<Notification> {
    match due {
        [] => None,
        [single] => {
            let o = &single.obligation;
            let title = if single.trigger == Trigger::Scheduled && single.lead_minutes > 0 {
                format!("{} in {} min", o.medication_name, single.lead_minutes)
            } else {
                format!("Time for {}", o.medication_name)
            };
            let body = o
                .reminder_message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("{} at {}", o.dose, o.time));
            Some(Notification {
                title,
                body,
                tag: format!("dose-{}", single.key()),
                actions: vec![
                    NotificationAction {
                        id: ACTION_CONFIRM.into(),
                        label: "Taken".into(),
                    },
                    NotificationAction {
                        id: ACTION_SNOOZE.into(),
                        label: format!("Snooze {} min", settings.snooze_minutes),
                    },
                ],
                vibrate: settings.vibration_enabled,
                data: serde_json::json!({
                    "obligationKey": single.key(),
                    "medicationId": o.medication_id,
                    "medicationName": o.medication_name,
                    "scheduledTime": o.time,
                    "date": o.date,
                }),
            })
        }
        many => {
            let names: Vec<&str> = many
                .iter()
                .map(|d| d.obligation.medication_name.as_str())
                .collect();
            let keys: Vec<ObligationKey> = many.iter().map(|d| d.key()).collect();
            Some(Notification {
                title: format!("{} doses due", many.len()),
                body: names.join(", "),
                tag: format!("dose-batch-{}", many[0].minute.format("%Y%m%dT%H%M")),
                actions: Vec::new(),
                vibrate: settings.vibration_enabled,
                data: serde_json::json!({ "obligationKeys": keys }),
            })
        }
    }
}

/// What one [`ReminderClock::tick`] did.
#[derive(Debug, Default, Serialize)]
pub struct TickReport {
    pub due: Vec<DueReminder>,
    pub notification: Option<Notification>,
    /// The dispatcher accepted the notification.
    pub dispatched: bool,
}

/// Drives [`on_tick`] against a dispatcher, owning the scheduler state.
pub struct ReminderClock<D> {
    dispatcher: D,
    state: SchedulerState,
    window: Duration,
    permission_warned: bool,
}

impl<D: NotificationDispatcher> ReminderClock<D> {
    /// `window` is the tick interval: how long after a snooze ends the
    /// reminder may still fire.
    pub fn new(dispatcher: D, window: Duration) -> Self {
        Self {
            dispatcher,
            state: SchedulerState::new(),
            window,
            permission_warned: false,
        }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Snooze `key` on `date` for the configured duration. Returns the resume time.
    pub fn snooze(
        &mut self,
        key: ObligationKey,
        date: NaiveDate,
        now: NaiveDateTime,
        settings: &Settings,
    ) -> NaiveDateTime {
        let resume = self.state.snooze(key.clone(), date, now, settings.snooze_minutes);
        tracing::info!(key = %key, %date, resume = %resume, "reminder snoozed");
        resume
    }

    /// Evaluate and dispatch. Never fails: a refused or failed dispatch is
    /// logged, leaves the dedup guard untouched, and the next tick runs normally.
    pub fn tick(
        &mut self,
        now: NaiveDateTime,
        settings: &Settings,
        medications: &[Medication],
        entries: &[LedgerEntry],
    ) -> TickReport {
        let (due, state) = on_tick(now, settings, medications, entries, &self.state, self.window);
        self.state = state;

        let Some(notification) = build_notification(&due, settings) else {
            return TickReport::default();
        };

        match self.dispatcher.permission() {
            Permission::Granted => self.permission_warned = false,
            permission => {
                if !self.permission_warned {
                    let error = DoseError::PermissionDenied;
                    tracing::warn!(?permission, %error, "reminders are silent");
                    self.permission_warned = true;
                }
                return TickReport {
                    due,
                    notification: Some(notification),
                    dispatched: false,
                };
            }
        }

        let dispatched = match self.dispatcher.dispatch(&notification) {
            Ok(()) => {
                self.state.record_fired(&due);
                tracing::info!(count = due.len(), tag = %notification.tag, "reminder dispatched");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, count = due.len(), "reminder dispatch failed");
                false
            }
        };

        TickReport {
            due,
            notification: Some(notification),
            dispatched,
        }
    }
}
