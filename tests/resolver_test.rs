mod helpers;

use dosewatch::dose::resolver::{expected_count, resolve_for_date};
use dosewatch::dose::types::{Medication, Schedule, Weekdays};
use helpers::{daily, day, medication, time};

#[test]
fn weekday_schedule_skips_saturday() {
    let ibuprofen = medication("Ibuprofè", &[("08:00", Weekdays::from_days(&[1, 2, 3, 4, 5]).unwrap())]);

    // 2026-10-17 is a Saturday
    assert!(resolve_for_date(&[ibuprofen.clone()], day("2026-10-17")).is_empty());

    // 2026-10-13 is a Tuesday
    let tuesday = resolve_for_date(&[ibuprofen.clone()], day("2026-10-13"));
    assert_eq!(tuesday.len(), 1);
    assert_eq!(tuesday[0].time, time("08:00"));
    assert_eq!(tuesday[0].medication_id, ibuprofen.id);
    assert_eq!(tuesday[0].date, day("2026-10-13"));
}

#[test]
fn one_obligation_per_matching_schedule() {
    let meds = vec![
        daily("Metformin", &["08:00", "20:00"]),
        medication("Vitamin D", &[("09:00", Weekdays::WEEKENDS)]),
        Medication::new("Unscheduled", "1 unit"),
    ];

    // Friday: two metformin slots only
    let friday = resolve_for_date(&meds, day("2026-10-16"));
    assert_eq!(friday.len(), 2);
    assert_eq!(expected_count(&meds, day("2026-10-16")), 2);

    // Sunday: vitamin D too
    let sunday = resolve_for_date(&meds, day("2026-10-18"));
    let times: Vec<String> = sunday.iter().map(|o| o.time.to_string()).collect();
    assert_eq!(times, vec!["08:00", "09:00", "20:00"]);
}

#[test]
fn ties_are_ordered_by_name() {
    let meds = vec![daily("Zinc", &["08:00"]), daily("Aspirin", &["08:00"])];
    let names: Vec<String> = resolve_for_date(&meds, day("2026-10-16"))
        .into_iter()
        .map(|o| o.medication_name)
        .collect();
    assert_eq!(names, vec!["Aspirin", "Zinc"]);
}

#[test]
fn resolution_is_deterministic() {
    let meds = vec![
        daily("B", &["12:00", "08:00"]),
        daily("A", &["12:00"]),
        medication("C", &[("08:00", Weekdays::WEEKDAYS)]),
    ];
    let first = resolve_for_date(&meds, day("2026-10-16"));
    let second = resolve_for_date(&meds, day("2026-10-16"));
    assert_eq!(first, second);
}

#[test]
fn schedule_dose_overrides_default() {
    let med = Medication::new("Prednisone", "5 mg")
        .with_schedule(Schedule::new(time("08:00"), Weekdays::EVERY_DAY).with_dose("10 mg"))
        .with_schedule(Schedule::new(time("20:00"), Weekdays::EVERY_DAY));
    let obligations = resolve_for_date(&[med], day("2026-10-16"));
    assert_eq!(obligations[0].dose, "10 mg");
    assert_eq!(obligations[1].dose, "5 mg");
}
