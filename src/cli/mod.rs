pub mod calendar;
pub mod doctor;
pub mod export;
pub mod history;
pub mod import;
pub mod meds;
pub mod settings;
pub mod today;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

use crate::config::DoseConfig;
use crate::store::SqliteStore;

/// Open the configured database, seeding settings defaults from config.
pub fn open_store(config: &DoseConfig) -> Result<SqliteStore> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)?;
    Ok(store.with_default_settings(config.defaults.settings()))
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected a date like 2026-01-31, got {input:?}"))
}

/// Parse `YYYY-MM-DD HH:MM` or `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .with_context(|| format!("expected a time like 2026-01-31 08:00, got {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2026-10-16 08:30").unwrap(), expected);
        assert_eq!(parse_datetime("2026-10-16T08:30:00").unwrap(), expected);
        assert!(parse_datetime("16/10/2026").is_err());
    }

    #[test]
    fn date_format() {
        assert_eq!(
            parse_date("2026-10-16").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );
        assert!(parse_date("2026-13-01").is_err());
    }
}
