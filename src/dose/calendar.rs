//! Calendar adherence: per-day classification and month aggregates.
//!
//! Expected counts come from the current plan. Schedules are not versioned,
//! so editing a plan also changes the expectation for past days.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::resolver::expected_count;
use super::types::{DoseStatus, LedgerEntry, Medication};
use crate::error::{DoseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Nothing was scheduled.
    None,
    Perfect,
    Partial,
    /// A past day with nothing taken.
    Missed,
    /// Today or a future day with nothing taken yet.
    Pending,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Perfect => "perfect",
            Self::Partial => "partial",
            Self::Missed => "missed",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub expected: usize,
    pub taken: usize,
    pub skipped: usize,
    pub status: DayStatus,
}

pub fn classify(expected: usize, taken: usize, date: NaiveDate, today: NaiveDate) -> DayStatus {
    if expected == 0 {
        DayStatus::None
    } else if taken >= expected {
        DayStatus::Perfect
    } else if taken > 0 {
        DayStatus::Partial
    } else if date < today {
        DayStatus::Missed
    } else {
        DayStatus::Pending
    }
}

/// Summarize `date`. `entries` may span any range; only that date is counted.
pub fn day_summary(
    medications: &[Medication],
    entries: &[LedgerEntry],
    date: NaiveDate,
    today: NaiveDate,
) -> DaySummary {
    let on_day = entries.iter().filter(|e| e.date() == date);
    let (taken, skipped) = on_day.fold((0, 0), |(t, s), e| match e.status {
        DoseStatus::Taken => (t + 1, s),
        DoseStatus::Skipped => (t, s + 1),
    });
    let expected = expected_count(medications, date);

    DaySummary {
        date,
        expected,
        taken,
        skipped,
        status: classify(expected, taken, date, today),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DaySummary>,
    /// Doses expected on days up to and including today.
    pub expected_to_date: usize,
    /// Taken doses up to today, counting at most `expected` per day.
    pub taken_to_date: usize,
    pub skipped: usize,
    /// `taken_to_date / expected_to_date`, rounded; `None` until a dose was expected.
    pub adherence_percent: Option<u8>,
}

pub fn month_summary(
    medications: &[Medication],
    entries: &[LedgerEntry],
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<MonthSummary> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DoseError::validation(format!("invalid month: {year}-{month:02}")))?;

    let days: Vec<DaySummary> = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| day_summary(medications, entries, d, today))
        .collect();

    let elapsed = days.iter().filter(|d| d.date <= today);
    let (expected_to_date, taken_to_date) = elapsed.fold((0, 0), |(e, t), d| {
        (e + d.expected, t + d.taken.min(d.expected))
    });
    let skipped = days.iter().map(|d| d.skipped).sum();

    let adherence_percent = (expected_to_date > 0)
        .then(|| ((taken_to_date * 100 + expected_to_date / 2) / expected_to_date) as u8);

    Ok(MonthSummary {
        year,
        month,
        days,
        expected_to_date,
        taken_to_date,
        skipped,
        adherence_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn classification_table() {
        let today = d("2026-10-16");
        let past = d("2026-10-10");
        let future = d("2026-10-20");

        assert_eq!(classify(0, 2, past, today), DayStatus::None);
        assert_eq!(classify(3, 3, past, today), DayStatus::Perfect);
        assert_eq!(classify(3, 4, today, today), DayStatus::Perfect);
        assert_eq!(classify(3, 1, past, today), DayStatus::Partial);
        assert_eq!(classify(3, 0, past, today), DayStatus::Missed);
        assert_eq!(classify(3, 0, today, today), DayStatus::Pending);
        assert_eq!(classify(3, 0, future, today), DayStatus::Pending);
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_summary(&[], &[], 2026, 13, d("2026-10-16")).is_err());
    }

    #[test]
    fn month_without_plan_has_no_percentage() {
        let summary = month_summary(&[], &[], 2026, 2, d("2026-10-16")).unwrap();
        assert_eq!(summary.days.len(), 28);
        assert_eq!(summary.adherence_percent, None);
        assert!(summary.days.iter().all(|day| day.status == DayStatus::None));
    }
}
