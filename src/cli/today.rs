use anyhow::Result;

use crate::config::DoseConfig;
use crate::dose::local_now;
use crate::dose::stock::is_low;
use crate::dose::tasks::{filter_tasks, get_tasks_for_today, next_task, progress, TaskConfirmer, TaskFilter};
use crate::dose::types::{ObligationKey, TimeOfDay};
use crate::notify::console::TerminalBell;
use crate::store::Store;

/// Print today's tasks, progress and the next pending dose.
pub fn today(config: &DoseConfig, filter: TaskFilter) -> Result<()> {
    let store = super::open_store(config)?;
    let today = local_now().date();

    let medications = store.medications()?;
    let entries = store.entries_on(today)?;
    let tasks = get_tasks_for_today(&medications, &entries, today);

    println!("Doses for {}", today.format("%A %Y-%m-%d"));
    println!("{}", "=".repeat(40));

    let shown = filter_tasks(&tasks, filter);
    if shown.is_empty() {
        println!("  (nothing to show)");
    }
    for task in shown {
        let mark = if task.is_taken { "x" } else { " " };
        let stock = match task.medication.stock {
            Some(s) if is_low(&task.medication) => format!("  [stock {s}, low]"),
            Some(s) => format!("  [stock {s}]"),
            None => String::new(),
        };
        println!(
            "  [{mark}] {}  {:<20} {}{stock}",
            task.schedule.time, task.medication.name, task.dose
        );
    }
    println!();
    println!("Progress:  {}%", progress(&tasks));
    match next_task(&tasks) {
        Some(next) => println!(
            "Next:      {} {} ({})",
            next.schedule.time, next.medication.name, next.dose
        ),
        None => println!("Next:      all done for today"),
    }

    Ok(())
}

/// Confirm today's dose of `medication_id` at `time`.
pub fn take(config: &DoseConfig, medication_id: &str, time: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let time: TimeOfDay = time.parse()?;
    let key = ObligationKey::new(medication_id, time);

    let settings = store.settings()?;
    let bell = TerminalBell {
        enabled: settings.vibration_enabled,
    };
    let outcome = TaskConfirmer::new().confirm_key(&store, &key, local_now(), &bell)?;

    if outcome.deduplicated {
        println!(
            "Already confirmed at {} ({}).",
            outcome.entry.taken_at.format("%H:%M"),
            outcome.entry.id
        );
        return Ok(());
    }

    println!("Recorded {} at {}.", outcome.entry.medication_name, outcome.entry.taken_at.format("%H:%M"));
    if let Some(stock) = outcome.stock {
        println!("Stock remaining: {stock}");
    }
    if outcome.low_stock {
        println!("WARNING: stock is running low. Refill with `dosewatch meds refill {medication_id} <units>`.");
    }
    Ok(())
}
