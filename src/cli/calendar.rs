use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};

use crate::config::DoseConfig;
use crate::dose::calendar::{day_summary, month_summary, DayStatus};
use crate::dose::local_now;
use crate::dose::tasks::tasks_for_date;
use crate::store::Store;

fn symbol(status: DayStatus) -> char {
    match status {
        DayStatus::None => '·',
        DayStatus::Perfect => '●',
        DayStatus::Partial => '◐',
        DayStatus::Missed => '○',
        DayStatus::Pending => '-',
    }
}

fn parse_month(input: &str) -> Result<(i32, u32)> {
    let (y, m) = input
        .trim()
        .split_once('-')
        .with_context(|| format!("expected a month like 2026-10, got {input:?}"))?;
    Ok((y.parse()?, m.parse()?))
}

/// Print a month grid (weeks start on Sunday) with adherence.
pub fn calendar(config: &DoseConfig, month: Option<&str>) -> Result<()> {
    let store = super::open_store(config)?;
    let today = local_now().date();
    let (year, month) = match month {
        Some(m) => parse_month(m)?,
        None => (today.year(), today.month()),
    };

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {year}-{month:02}"))?;
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);

    let medications = store.medications()?;
    let entries = store.entries_between(first, last)?;
    let summary = month_summary(&medications, &entries, year, month, today)?;

    println!("{}", first.format("%B %Y"));
    println!(" Su Mo Tu We Th Fr Sa");
    let offset = first.weekday().num_days_from_sunday() as usize;
    let mut line = "   ".repeat(offset);
    for day in &summary.days {
        line.push_str(&format!("{:>2}{}", day.date.day(), symbol(day.status)));
        if day.date.weekday().num_days_from_sunday() == 6 {
            println!("{line}");
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{line}");
    }
    println!();
    println!("● perfect  ◐ partial  ○ missed  - pending  · nothing scheduled");
    println!();
    println!("Taken:     {} of {} expected so far", summary.taken_to_date, summary.expected_to_date);
    println!("Skipped:   {}", summary.skipped);
    match summary.adherence_percent {
        Some(p) => println!("Adherence: {p}%"),
        None => println!("Adherence: n/a"),
    }
    Ok(())
}

/// Print one day's status and its doses.
pub fn day(config: &DoseConfig, date: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let date = super::parse_date(date)?;
    let today = local_now().date();

    let medications = store.medications()?;
    let entries = store.entries_on(date)?;
    let summary = day_summary(&medications, &entries, date, today);

    println!("{}: {}", date.format("%A %Y-%m-%d"), summary.status);
    println!(
        "  expected {}, taken {}, skipped {}",
        summary.expected, summary.taken, summary.skipped
    );
    for task in tasks_for_date(&medications, &entries, date) {
        let mark = if task.is_taken { "x" } else { " " };
        println!("  [{mark}] {}  {}  {}", task.schedule.time, task.medication.name, task.dose);
    }
    Ok(())
}
