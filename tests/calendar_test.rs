mod helpers;

use dosewatch::dose::calendar::{day_summary, month_summary, DayStatus};
use helpers::{daily, day, skipped, taken};

#[test]
fn past_day_with_one_of_three_is_partial() {
    let med = daily("Amoxicillin", &["08:00", "14:00", "20:00"]);
    let entries = vec![taken(&med, "2026-10-10T08:05:00", Some("08:00"))];

    let summary = day_summary(&[med], &entries, day("2026-10-10"), day("2026-10-16"));
    assert_eq!(summary.expected, 3);
    assert_eq!(summary.taken, 1);
    assert_eq!(summary.status, DayStatus::Partial);
}

#[test]
fn day_classifications() {
    let med = daily("Aspirin", &["09:00"]);
    let today = day("2026-10-16");
    let entries = vec![
        taken(&med, "2026-10-14T09:01:00", Some("09:00")),
        skipped(&med, "2026-10-15T09:30:00", Some("09:00")),
    ];
    let meds = vec![med];

    assert_eq!(day_summary(&meds, &entries, day("2026-10-14"), today).status, DayStatus::Perfect);

    let skipped_day = day_summary(&meds, &entries, day("2026-10-15"), today);
    assert_eq!(skipped_day.status, DayStatus::Missed);
    assert_eq!(skipped_day.skipped, 1);

    assert_eq!(day_summary(&meds, &entries, today, today).status, DayStatus::Pending);
    assert_eq!(day_summary(&[], &entries, today, today).status, DayStatus::None);
}

#[test]
fn month_adherence_counts_elapsed_days_only() {
    // twice daily; today is the 3rd
    let med = daily("Metformin", &["08:00", "20:00"]);
    let entries = vec![
        taken(&med, "2026-10-01T08:00:00", Some("08:00")),
        taken(&med, "2026-10-01T20:00:00", Some("20:00")),
        taken(&med, "2026-10-02T08:00:00", Some("08:00")),
        // an extra entry beyond what was expected is capped
        taken(&med, "2026-10-02T08:30:00", None),
        taken(&med, "2026-10-02T21:00:00", None),
        skipped(&med, "2026-10-03T08:00:00", Some("08:00")),
    ];

    let summary = month_summary(&[med], &entries, 2026, 10, day("2026-10-03")).unwrap();
    assert_eq!(summary.days.len(), 31);
    assert_eq!(summary.expected_to_date, 6);
    // day 1: 2, day 2: min(3, 2) = 2, day 3: 0
    assert_eq!(summary.taken_to_date, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.adherence_percent, Some(67));

    assert_eq!(summary.days[0].status, DayStatus::Perfect);
    assert_eq!(summary.days[2].status, DayStatus::Pending);
    assert_eq!(summary.days[10].status, DayStatus::Pending);
}

#[test]
fn future_month_has_no_adherence_yet() {
    let med = daily("Aspirin", &["09:00"]);
    let summary = month_summary(&[med], &[], 2026, 11, day("2026-10-16")).unwrap();
    assert_eq!(summary.expected_to_date, 0);
    assert_eq!(summary.adherence_percent, None);
}
