use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dosewatch::cli;
use dosewatch::config::DoseConfig;
use dosewatch::dose::tasks::TaskFilter;
use dosewatch::dose::types::DoseStatus;
use dosewatch::runner;

#[derive(Parser)]
#[command(name = "dosewatch", version, about = "Medication dose scheduling and reminders")]
struct Cli {
    /// Config file (default: ~/.dosewatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reminder loop; notifications go to stdout, actions are read from stdin
    Run,
    /// Show today's doses
    Today {
        /// pending, completed or all
        #[arg(long, default_value = "pending")]
        filter: TaskFilter,
    },
    /// Confirm today's dose of a medication at a scheduled time
    Take {
        medication_id: String,
        /// Scheduled time, HH:MM
        time: String,
    },
    /// Add a manual ledger entry
    Log {
        medication_id: String,
        /// When, e.g. "2026-10-16 08:05"
        #[arg(long)]
        at: String,
        #[arg(long, default_value = "taken")]
        status: DoseStatus,
        /// Schedule slot this entry fulfils, HH:MM
        #[arg(long)]
        slot: Option<String>,
    },
    /// Show recent ledger entries
    History {
        #[arg(long, default_value_t = cli::history::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Show a month calendar with adherence
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show one day's status and doses
    Day {
        /// Date as YYYY-MM-DD
        date: String,
    },
    /// Manage medications
    Meds {
        #[command(subcommand)]
        action: MedsAction,
    },
    /// Show or change reminder settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Export medications, ledger and settings as JSON to stdout
    Export,
    /// Import from a JSON file (export format or legacy layout)
    Import { file: PathBuf },
    /// Run database diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Change an entry's time or status
    Edit {
        id: String,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        status: Option<DoseStatus>,
    },
    /// Delete an entry
    Delete { id: String },
}

#[derive(Subcommand)]
enum MedsAction {
    /// List medications and their schedules
    List,
    /// Add a medication
    Add {
        name: String,
        #[arg(long)]
        dose: Option<String>,
        /// Schedule, repeatable: HH:MM[@days][=dose], days = daily|weekdays|weekends|0,1,..6
        #[arg(long = "at", required = true)]
        schedules: Vec<String>,
        #[arg(long)]
        stock: Option<u32>,
        #[arg(long)]
        units_per_dose: Option<u32>,
        #[arg(long)]
        low_stock_threshold: Option<u32>,
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Do not send reminders for this medication
        #[arg(long)]
        no_alarm: bool,
    },
    /// Remove a medication (its history is kept)
    Remove { id: String },
    /// Add units to a medication's stock
    Refill { id: String, units: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        snooze_minutes: Option<u32>,
        #[arg(long)]
        remind_before_minutes: Option<u32>,
        #[arg(long)]
        vibration: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => DoseConfig::load_from(path)?,
        None => DoseConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output and notification JSON.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run => runner::run(config).await?,
        Command::Today { filter } => cli::today::today(&config, filter)?,
        Command::Take {
            medication_id,
            time,
        } => cli::today::take(&config, &medication_id, &time)?,
        Command::Log {
            medication_id,
            at,
            status,
            slot,
        } => cli::history::log(&config, &medication_id, status, &at, slot.as_deref())?,
        Command::History { limit, action } => match action {
            None => cli::history::history(&config, limit)?,
            Some(HistoryAction::Edit { id, at, status }) => {
                cli::history::edit(&config, &id, at.as_deref(), status)?
            }
            Some(HistoryAction::Delete { id }) => cli::history::delete(&config, &id)?,
        },
        Command::Calendar { month } => cli::calendar::calendar(&config, month.as_deref())?,
        Command::Day { date } => cli::calendar::day(&config, &date)?,
        Command::Meds { action } => match action {
            MedsAction::List => cli::meds::list(&config)?,
            MedsAction::Add {
                name,
                dose,
                schedules,
                stock,
                units_per_dose,
                low_stock_threshold,
                message,
                notes,
                no_alarm,
            } => {
                let low_stock_threshold =
                    low_stock_threshold.or(Some(config.defaults.low_stock_threshold));
                cli::meds::add(
                    &config,
                    cli::meds::NewMedication {
                        name,
                        dose,
                        schedules,
                        stock,
                        units_per_dose,
                        low_stock_threshold,
                        reminder_message: message,
                        notes,
                        no_alarm,
                    },
                )?
            }
            MedsAction::Remove { id } => cli::meds::remove(&config, &id)?,
            MedsAction::Refill { id, units } => cli::meds::refill(&config, &id, &units)?,
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => cli::settings::show(&config)?,
            SettingsAction::Set {
                notifications,
                snooze_minutes,
                remind_before_minutes,
                vibration,
            } => cli::settings::set(
                &config,
                cli::settings::SettingsUpdate {
                    notifications_enabled: notifications,
                    snooze_minutes,
                    remind_before_minutes,
                    vibration_enabled: vibration,
                },
            )?,
        },
        Command::Export => cli::export::export(&config)?,
        Command::Import { file } => cli::import::import(&config, &file)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
