//! CLI `meds` commands: list, add, remove and refill medications.

use anyhow::{Context, Result};

use crate::config::DoseConfig;
use crate::dose::stock;
use crate::dose::types::{Medication, Schedule, TimeOfDay, Weekdays, DEFAULT_DOSE};
use crate::error::DoseError;
use crate::store::Store;

/// Fields for `meds add`.
#[derive(Debug, Default)]
pub struct NewMedication {
    pub name: String,
    pub dose: Option<String>,
    /// `HH:MM` (every day) or `HH:MM@days`, days being `weekdays`,
    /// `weekends`, `daily` or a list like `1,3,5` (0 = Sunday).
    pub schedules: Vec<String>,
    pub stock: Option<u32>,
    pub units_per_dose: Option<u32>,
    pub low_stock_threshold: Option<u32>,
    pub reminder_message: Option<String>,
    pub notes: Option<String>,
    pub no_alarm: bool,
}

/// Parse a schedule argument. A per-slot dose may follow a `=`: `08:00@weekdays=2 tablets`.
pub fn parse_schedule(input: &str) -> Result<Schedule> {
    let (slot, dose) = match input.split_once('=') {
        Some((slot, dose)) => (slot, Some(dose.trim())),
        None => (input, None),
    };
    let (time, days) = match slot.split_once('@') {
        Some((time, days)) => (time, days.parse::<Weekdays>()?),
        None => (slot, Weekdays::EVERY_DAY),
    };
    if days.is_empty() {
        return Err(DoseError::validation(format!("schedule {input:?} selects no days")).into());
    }
    let schedule = Schedule::new(time.parse::<TimeOfDay>()?, days);
    Ok(match dose {
        Some(d) if !d.is_empty() => schedule.with_dose(d),
        _ => schedule,
    })
}

pub fn build_medication(new: NewMedication) -> Result<Medication> {
    let dose = new
        .dose
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOSE.to_string());
    let mut medication = Medication::new(new.name.trim(), dose);
    for arg in &new.schedules {
        let schedule =
            parse_schedule(arg).with_context(|| format!("bad --at value {arg:?}"))?;
        medication = medication.with_schedule(schedule);
    }
    medication.stock = new.stock;
    medication.units_per_dose = new.units_per_dose;
    medication.low_stock_threshold = new.low_stock_threshold;
    medication.reminder_message = new.reminder_message;
    medication.notes = new.notes;
    medication.alarm_enabled = !new.no_alarm;
    medication.validate()?;
    Ok(medication)
}

pub fn list(config: &DoseConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let medications = store.medications()?;

    if medications.is_empty() {
        println!("No medications. Add one with `dosewatch meds add <name> --at 08:00`.");
        return Ok(());
    }

    for med in &medications {
        let alarm = if med.alarm_enabled { "" } else { "  (alarm off)" };
        println!("{}  {}{alarm}", med.name, med.id);
        println!("  dose:      {}", med.dose);
        for s in &med.schedules {
            let dose = s.dose.as_deref().map(|d| format!("  {d}")).unwrap_or_default();
            println!("  at {}     days {}{dose}", s.time, s.days);
        }
        if let Some(stock) = med.stock {
            let low = if stock::is_low(med) { "  LOW" } else { "" };
            println!(
                "  stock:     {stock} ({} per dose, low at {}){low}",
                med.effective_units_per_dose(),
                med.effective_low_stock_threshold()
            );
        }
        if let Some(ref message) = med.reminder_message {
            println!("  reminder:  {message}");
        }
        if let Some(ref notes) = med.notes {
            println!("  notes:     {notes}");
        }
        println!();
    }
    Ok(())
}

pub fn add(config: &DoseConfig, new: NewMedication) -> Result<()> {
    let store = super::open_store(config)?;
    let medication = build_medication(new)?;
    store.save_medication(&medication)?;
    tracing::info!(medication_id = %medication.id, "medication added");
    println!("Added {} ({})", medication.name, medication.id);
    Ok(())
}

pub fn remove(config: &DoseConfig, id: &str) -> Result<()> {
    let store = super::open_store(config)?;
    if store.delete_medication(id)? {
        println!("Removed medication {id}. Its history is kept.");
    } else {
        println!("No medication with id {id}.");
    }
    Ok(())
}

pub fn refill(config: &DoseConfig, id: &str, units: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let added = stock::parse_units(units)?;
    let stock = stock::refill(&store, id, added)?;
    println!("Stock is now {stock}.");
    Ok(())
}
