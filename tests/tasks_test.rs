mod helpers;

use dosewatch::dose::ledger::is_fulfilled;
use dosewatch::dose::resolver::resolve_for_date;
use dosewatch::dose::tasks::{
    filter_tasks, get_tasks_for_today, next_task, progress, TaskConfirmer, TaskFilter,
};
use dosewatch::dose::types::ObligationKey;
use dosewatch::error::DoseError;
use dosewatch::notify::NoFeedback;
use dosewatch::store::Store;
use helpers::{at, daily, day, seed, taken, test_store, time, CountingFeedback};

#[test]
fn one_of_two_slots_taken_is_half_progress() {
    let med = daily("Metformin", &["08:00", "20:00"]);
    let entries = vec![taken(&med, "2026-10-16T08:03:00", Some("08:00"))];

    let tasks = get_tasks_for_today(&[med], &entries, day("2026-10-16"));
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].is_taken);
    assert_eq!(tasks[0].schedule.time, time("08:00"));
    assert!(!tasks[1].is_taken);
    assert_eq!(progress(&tasks), 50);

    assert_eq!(filter_tasks(&tasks, TaskFilter::Pending).len(), 1);
    assert_eq!(filter_tasks(&tasks, TaskFilter::Completed).len(), 1);
    assert_eq!(filter_tasks(&tasks, TaskFilter::All).len(), 2);
    assert_eq!(next_task(&tasks).unwrap().schedule.time, time("20:00"));
}

#[test]
fn three_confirmations_consume_units_per_dose() {
    let store = test_store();
    let mut med = daily("Amoxicillin", &["08:00", "14:00", "20:00"]);
    med.stock = Some(20);
    med.units_per_dose = Some(2);
    seed(&store, vec![med.clone()]);

    let confirmer = TaskConfirmer::new();
    let today = day("2026-10-16");
    for (slot, now) in [
        ("08:00", "2026-10-16T08:01:00"),
        ("14:00", "2026-10-16T14:02:00"),
        ("20:00", "2026-10-16T20:00:30"),
    ] {
        let key = ObligationKey::new(&med.id, time(slot));
        let outcome = confirmer.confirm_key(&store, &key, at(now), &NoFeedback).unwrap();
        assert!(!outcome.deduplicated);
    }

    assert_eq!(store.medication(&med.id).unwrap().unwrap().stock, Some(14));
    let tasks = get_tasks_for_today(&[med], &store.entries_on(today).unwrap(), today);
    assert_eq!(progress(&tasks), 100);
    assert!(next_task(&tasks).is_none());
}

#[test]
fn confirmed_obligation_is_fulfilled() {
    let store = test_store();
    let mut med = daily("Aspirin", &["09:00"]);
    med.stock = Some(1);
    seed(&store, vec![med.clone()]);

    let today = day("2026-10-16");
    let task = get_tasks_for_today(&[med.clone()], &[], today).remove(0);
    let feedback = CountingFeedback::default();
    let outcome = TaskConfirmer::new()
        .confirm(&store, &task, at("2026-10-16T09:00:10"), &feedback)
        .unwrap();

    let obligation = resolve_for_date(&[med.clone()], today).remove(0);
    assert!(is_fulfilled(&obligation, &store.entries_on(today).unwrap()));
    assert_eq!(outcome.entry.scheduled_time, Some(time("09:00")));
    assert_eq!(outcome.stock, Some(0));
    assert!(outcome.low_stock);
    assert_eq!(feedback.successes.get(), 1);
    assert_eq!(feedback.warnings.get(), 1);
}

#[test]
fn repeated_confirmation_does_not_double_decrement() {
    let store = test_store();
    let mut med = daily("Aspirin", &["09:00"]);
    med.stock = Some(10);
    seed(&store, vec![med.clone()]);

    let confirmer = TaskConfirmer::new();
    let key = ObligationKey::new(&med.id, time("09:00"));
    let first = confirmer.confirm_key(&store, &key, at("2026-10-16T09:00:00"), &NoFeedback).unwrap();
    let second = confirmer.confirm_key(&store, &key, at("2026-10-16T09:05:00"), &NoFeedback).unwrap();

    assert!(second.deduplicated);
    assert_eq!(second.entry.id, first.entry.id);
    assert_eq!(store.entries().unwrap().len(), 1);
    assert_eq!(store.medication(&med.id).unwrap().unwrap().stock, Some(9));
}

#[test]
fn untracked_stock_is_left_alone() {
    let store = test_store();
    let med = daily("Aspirin", &["09:00"]);
    seed(&store, vec![med.clone()]);

    let key = ObligationKey::new(&med.id, time("09:00"));
    let outcome = TaskConfirmer::new()
        .confirm_key(&store, &key, at("2026-10-16T09:00:00"), &NoFeedback)
        .unwrap();
    assert_eq!(outcome.stock, None);
    assert!(!outcome.low_stock);
    assert_eq!(store.medication(&med.id).unwrap().unwrap().stock, None);
}

#[test]
fn confirming_unknown_slot_is_not_found() {
    let store = test_store();
    let med = daily("Aspirin", &["09:00"]);
    seed(&store, vec![med.clone()]);

    let key = ObligationKey::new(&med.id, time("10:00"));
    let err = TaskConfirmer::new()
        .confirm_key(&store, &key, at("2026-10-16T10:00:00"), &NoFeedback)
        .unwrap_err();
    assert!(matches!(err, DoseError::NotFound { kind: "dose", .. }));
    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn failed_ledger_write_leaves_task_pending() {
    let store = test_store();
    let med = daily("Aspirin", &["09:00"]);
    seed(&store, vec![med.clone()]);
    let today = day("2026-10-16");
    let task = get_tasks_for_today(&[med.clone()], &[], today).remove(0);

    store
        .connection()
        .execute_batch("DROP TABLE ledger_entries")
        .unwrap();

    let feedback = CountingFeedback::default();
    let result = TaskConfirmer::new().confirm(&store, &task, at("2026-10-16T09:00:00"), &feedback);
    assert!(result.is_err());
    assert_eq!(feedback.successes.get(), 0);
    assert_eq!(feedback.warnings.get(), 1);
}

#[test]
fn entries_from_other_days_do_not_count() {
    let med = daily("Aspirin", &["09:00"]);
    let yesterday = taken(&med, "2026-10-15T09:00:00", Some("09:00"));
    let tasks = get_tasks_for_today(&[med], &[yesterday], day("2026-10-16"));
    assert!(!tasks[0].is_taken);
    assert_eq!(progress(&tasks), 0);
}
