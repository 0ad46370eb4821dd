//! Medication dose scheduling and reminders.
//!
//! dosewatch turns a set of medications, each with one or more weekly
//! schedules, into concrete dose obligations per calendar date. It records
//! confirmations in an adherence ledger, keeps per-medication stock counts,
//! and fires timed reminders (with pre-reminders and snoozing) through a
//! pluggable notification dispatcher.
//!
//! | Concept | Where |
//! |---------|-------|
//! | Weekly plan → obligations for a date | [`dose::resolver`] |
//! | Confirmations, fulfillment matching | [`dose::ledger`] |
//! | Today's tasks, confirm action | [`dose::tasks`] |
//! | Reminder tick, snooze, dedup guard | [`dose::reminder`] |
//! | Remaining units, refill | [`dose::stock`] |
//! | Day status, month adherence | [`dose::calendar`] |
//!
//! # Architecture
//!
//! - **Time**: local wall-clock `NaiveDateTime`, always passed in explicitly
//! - **Storage**: synchronous [`store::Store`] trait, SQLite implementation
//! - **Notifications**: [`notify::NotificationDispatcher`]; the user's choice comes back as an [`notify::InboundAction`]
//! - **Loop**: [`runner`] drives the reminder clock on a tokio interval
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`dose`]: Core engine: plan resolution, ledger, tasks, reminders, stock, calendar
//! - [`error`]: Domain error type
//! - [`notify`]: Notification dispatch and feedback boundaries
//! - [`runner`]: Timer-driven reminder loop
//! - [`store`]: Persistence boundary and its SQLite implementation
//! - [`cli`]: Terminal commands

pub mod cli;
pub mod config;
pub mod db;
pub mod dose;
pub mod error;
pub mod notify;
pub mod runner;
pub mod store;
