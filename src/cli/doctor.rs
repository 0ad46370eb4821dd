//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use crate::config::DoseConfig;
use crate::db;
use crate::dose::stock;
use crate::store::{SqliteStore, Store};

/// Run database diagnostics and print a health report.
pub fn doctor(config: &DoseConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `dosewatch meds add` or `dosewatch run` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    let store = SqliteStore::new(conn).with_default_settings(config.defaults.settings());
    let low_stock: Vec<String> = store
        .medications()?
        .iter()
        .filter(|m| stock::is_low(m))
        .map(|m| format!("{} ({})", m.name, m.stock.unwrap_or(0)))
        .collect();
    let settings = store.settings()?;

    println!("dosewatch Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Medications:     {}", report.medication_count);
    println!("  Schedules:       {}", report.schedule_count);
    println!("  Ledger entries:  {}", report.ledger_count);
    println!();
    println!("Reminders:         {}", if settings.notifications_enabled { "enabled" } else { "DISABLED" });
    println!("Tick interval:     {}s", config.tick_interval().as_secs());
    if !low_stock.is_empty() {
        println!("Low stock:         {}", low_stock.join(", "));
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }

    if !report.integrity_ok {
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.dosewatch/doses.db");
        println!("  2. Or export from a good copy and reimport:");
        println!("     dosewatch export > backup.json");
        println!("     dosewatch import backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
