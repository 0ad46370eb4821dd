//! Reminder loop for `dosewatch run`.
//!
//! Each tick re-reads the plan, ledger and settings from the store, so edits
//! made by other commands are picked up without a restart. User responses
//! arrive on stdin as newline-delimited [`InboundAction`] JSON.

use anyhow::Result;
use chrono::NaiveDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::config::DoseConfig;
use crate::dose::local_now;
use crate::dose::reminder::{ReminderClock, TickReport};
use crate::dose::tasks::{ConfirmOutcome, TaskConfirmer};
use crate::dose::types::{LedgerEntry, Medication, Settings};
use crate::notify::console::{ConsoleDispatcher, TerminalBell};
use crate::notify::{InboundAction, NotificationDispatcher};
use crate::store::{SqliteStore, Store};

/// Result of applying one inbound action.
#[derive(Debug)]
pub enum ActionOutcome {
    Confirmed(ConfirmOutcome),
    Snoozed { resume: NaiveDateTime },
}

fn tick_inputs(
    store: &dyn Store,
    now: NaiveDateTime,
) -> crate::error::Result<(Settings, Vec<Medication>, Vec<LedgerEntry>)> {
    let today = now.date();
    let tomorrow = today.succ_opt().unwrap_or(today);
    Ok((
        store.settings()?,
        store.medications()?,
        store.entries_between(today, tomorrow)?,
    ))
}

/// Run one reminder tick against the store. A failed read skips the tick.
pub fn tick_once<D: NotificationDispatcher>(
    store: &dyn Store,
    clock: &mut ReminderClock<D>,
    now: NaiveDateTime,
) -> TickReport {
    match tick_inputs(store, now) {
        Ok((settings, medications, entries)) => clock.tick(now, &settings, &medications, &entries),
        Err(e) => {
            tracing::warn!(error = %e, "reminder tick skipped: store read failed");
            TickReport::default()
        }
    }
}

/// Apply a confirm or snooze coming back from a notification. The action
/// applies to the obligation on its `date`, or today's when it has none.
pub fn apply_action<D: NotificationDispatcher>(
    store: &dyn Store,
    clock: &mut ReminderClock<D>,
    confirmer: &TaskConfirmer,
    action: &InboundAction,
    now: NaiveDateTime,
) -> crate::error::Result<ActionOutcome> {
    let settings = store.settings()?;
    let date = action.date().unwrap_or_else(|| now.date());
    match action {
        InboundAction::Confirm { obligation_key, .. } => {
            let bell = TerminalBell {
                enabled: settings.vibration_enabled,
            };
            let outcome = confirmer.confirm_key_on(store, obligation_key, date, now, &bell)?;
            tracing::info!(
                key = %obligation_key,
                %date,
                entry_id = %outcome.entry.id,
                deduplicated = outcome.deduplicated,
                "dose confirmed from notification"
            );
            Ok(ActionOutcome::Confirmed(outcome))
        }
        InboundAction::Snooze { obligation_key, .. } => {
            let resume = clock.snooze(obligation_key.clone(), date, now, &settings);
            Ok(ActionOutcome::Snoozed { resume })
        }
    }
}

fn handle_line<D: NotificationDispatcher>(
    store: &dyn Store,
    clock: &mut ReminderClock<D>,
    confirmer: &TaskConfirmer,
    line: &str,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let action: InboundAction = match serde_json::from_str(line) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed action line");
            return;
        }
    };
    if let Err(e) = apply_action(store, clock, confirmer, &action, local_now()) {
        tracing::warn!(key = %action.key(), error = %e, "action failed");
    }
}

/// Run the reminder loop until Ctrl-C.
pub async fn run(config: DoseConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)?.with_default_settings(config.defaults.settings());
    tracing::info!(db = %db_path.display(), "database ready");

    let interval = config.tick_interval();
    let window = chrono::Duration::seconds(interval.as_secs() as i64);
    let mut clock = ReminderClock::new(ConsoleDispatcher, window);
    let confirmer = TaskConfirmer::new();

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(tick_secs = interval.as_secs(), "reminder loop running");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                let report = tick_once(&store, &mut clock, local_now());
                if !report.due.is_empty() {
                    tracing::debug!(due = report.due.len(), dispatched = report.dispatched, "tick");
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(&store, &mut clock, &confirmer, &line),
                Ok(None) => {
                    tracing::debug!("stdin closed; no more inbound actions");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed; no more inbound actions");
                    stdin_open = false;
                }
            },
        }
    }

    tracing::info!("reminder loop stopped");
    Ok(())
}
