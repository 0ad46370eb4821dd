use anyhow::Result;
use serde::Serialize;

use crate::config::DoseConfig;
use crate::dose::types::{LedgerEntry, Medication, Settings};
use crate::store::Store;

/// Export format: the plan, the ledger and the settings.
#[derive(Debug, Serialize)]
pub struct ExportData {
    pub medications: Vec<Medication>,
    pub entries: Vec<LedgerEntry>,
    pub settings: Settings,
}

pub fn collect(store: &dyn Store) -> crate::error::Result<ExportData> {
    Ok(ExportData {
        medications: store.medications()?,
        entries: store.entries()?,
        settings: store.settings()?,
    })
}

/// Export everything as JSON to stdout.
pub fn export(config: &DoseConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let data = collect(&store)?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} medications and {} ledger entries.",
        data.medications.len(),
        data.entries.len()
    );

    Ok(())
}
