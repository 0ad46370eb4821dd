mod helpers;

use chrono::Duration;
use dosewatch::dose::reminder::{on_tick, ReminderClock, SchedulerState, Trigger};
use dosewatch::dose::types::{ObligationKey, Settings};
use dosewatch::notify::{InboundAction, Permission, ACTION_CONFIRM};
use helpers::{at, daily, day, taken, time, RecordingDispatcher};

fn window() -> Duration {
    Duration::seconds(30)
}

fn lead(minutes: u32) -> Settings {
    Settings {
        remind_before_minutes: minutes,
        ..Settings::default()
    }
}

#[test]
fn pre_reminder_fires_once_per_minute() {
    let meds = vec![daily("Aspirin", &["09:00"])];
    let settings = lead(10);

    // 08:49:30 is before the notify target
    let (due, state) = on_tick(at("2026-10-16T08:49:30"), &settings, &meds, &[], &SchedulerState::new(), window());
    assert!(due.is_empty());

    let (due, mut state) = on_tick(at("2026-10-16T08:50:00"), &settings, &meds, &[], &state, window());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].trigger, Trigger::Scheduled);
    assert_eq!(due[0].minute, at("2026-10-16T08:50:00"));
    state.record_fired(&due);

    // same minute, later ticks
    let (again, state) = on_tick(at("2026-10-16T08:50:30"), &settings, &meds, &[], &state, window());
    assert!(again.is_empty());
    let (again, _) = on_tick(at("2026-10-16T08:50:59"), &settings, &meds, &[], &state, window());
    assert!(again.is_empty());
}

#[test]
fn nothing_fires_at_the_scheduled_minute_with_a_lead() {
    let meds = vec![daily("Aspirin", &["09:00"])];
    let (due, _) = on_tick(at("2026-10-16T09:00:00"), &lead(10), &meds, &[], &SchedulerState::new(), window());
    assert!(due.is_empty());
}

#[test]
fn fulfilled_obligation_stops_reminding() {
    let med = daily("Aspirin", &["09:00"]);
    let entries = vec![taken(&med, "2026-10-16T08:40:00", Some("09:00"))];
    let (due, _) = on_tick(at("2026-10-16T09:00:00"), &Settings::default(), &[med], &entries, &SchedulerState::new(), window());
    assert!(due.is_empty());
}

#[test]
fn snoozed_key_is_excluded_until_resume() {
    let med = daily("Aspirin", &["09:00"]);
    let meds = vec![med.clone()];
    let settings = Settings::default();
    let key = ObligationKey::new(&med.id, time("09:00"));

    let (due, mut state) = on_tick(at("2026-10-16T09:00:00"), &settings, &meds, &[], &SchedulerState::new(), window());
    state.record_fired(&due);
    let resume = state.snooze(key.clone(), day("2026-10-16"), at("2026-10-16T09:00:20"), 10);
    assert_eq!(resume, at("2026-10-16T09:10:20"));

    let mut now = at("2026-10-16T09:00:50");
    while now < resume {
        let (due, next) = on_tick(now, &settings, &meds, &[], &state, window());
        assert!(due.is_empty(), "fired while snoozed at {now}");
        assert!(next.is_snoozed(&key, day("2026-10-16"), now));
        state = next;
        now += Duration::seconds(30);
    }

    let (due, mut state) = on_tick(resume, &settings, &meds, &[], &state, window());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].trigger, Trigger::SnoozeElapsed);
    state.record_fired(&due);
    assert_eq!(state.snoozed_until(&key, day("2026-10-16")), None);

    // snooze consumed: the following tick is quiet
    let (due, _) = on_tick(resume + Duration::seconds(30), &settings, &meds, &[], &state, window());
    assert!(due.is_empty());
}

#[test]
fn snooze_resume_missed_by_more_than_a_window_is_dropped() {
    let med = daily("Aspirin", &["09:00"]);
    let meds = vec![med.clone()];
    let mut state = SchedulerState::new();
    state.snooze(ObligationKey::new(&med.id, time("09:00")), day("2026-10-16"), at("2026-10-16T09:00:00"), 10);

    let (due, state) = on_tick(at("2026-10-16T09:12:00"), &Settings::default(), &meds, &[], &state, window());
    assert!(due.is_empty());
    assert_eq!(state, SchedulerState::new());
}

#[test]
fn elapsed_snooze_fires_before_the_notify_target() {
    let med = daily("Aspirin", &["09:00"]);
    let meds = vec![med.clone()];
    let mut state = SchedulerState::new();
    state.snooze(ObligationKey::new(&med.id, time("09:00")), day("2026-10-16"), at("2026-10-16T08:30:00"), 10);

    let (due, _) = on_tick(at("2026-10-16T08:40:10"), &Settings::default(), &meds, &[], &state, window());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].trigger, Trigger::SnoozeElapsed);
}

#[test]
fn snooze_applies_only_to_its_date() {
    let med = daily("Night", &["00:05"]);
    let meds = vec![med.clone()];
    let key = ObligationKey::new(&med.id, time("00:05"));
    let mut state = SchedulerState::new();
    state.snooze(key.clone(), day("2026-10-17"), at("2026-10-16T23:55:00"), 5);

    // tomorrow's pre-reminder is held back until the snooze ends
    let (due, state) = on_tick(at("2026-10-16T23:57:00"), &lead(10), &meds, &[], &state, window());
    assert!(due.is_empty());
    assert_eq!(state.snoozed_until(&key, day("2026-10-16")), None);

    let (due, _) = on_tick(at("2026-10-17T00:00:00"), &lead(10), &meds, &[], &state, window());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].obligation.date, day("2026-10-17"));
    assert_eq!(due[0].trigger, Trigger::SnoozeElapsed);
}

#[test]
fn clock_dispatches_one_grouped_notification() {
    let meds = vec![daily("Aspirin", &["08:00"]), daily("Zinc", &["08:00"])];
    let mut clock = ReminderClock::new(RecordingDispatcher::new(), window());

    let report = clock.tick(at("2026-10-16T08:00:00"), &Settings::default(), &meds, &[]);
    assert!(report.dispatched);
    assert_eq!(report.due.len(), 2);
    assert_eq!(clock.dispatcher().sent_count(), 1);
    assert_eq!(clock.dispatcher().sent.borrow()[0].title, "2 doses due");

    let report = clock.tick(at("2026-10-16T08:00:30"), &Settings::default(), &meds, &[]);
    assert!(report.due.is_empty());
    assert_eq!(clock.dispatcher().sent_count(), 1);
}

#[test]
fn failed_dispatch_does_not_mark_fired() {
    let meds = vec![daily("Aspirin", &["08:00"])];
    let dispatcher = RecordingDispatcher::new();
    dispatcher.fail.set(true);
    let mut clock = ReminderClock::new(dispatcher, window());

    let report = clock.tick(at("2026-10-16T08:00:00"), &Settings::default(), &meds, &[]);
    assert!(!report.dispatched);
    assert_eq!(report.due.len(), 1);

    // the next tick in the same minute retries
    clock.dispatcher().fail.set(false);
    let report = clock.tick(at("2026-10-16T08:00:30"), &Settings::default(), &meds, &[]);
    assert!(report.dispatched);
    assert_eq!(clock.dispatcher().sent_count(), 1);
}

#[test]
fn missing_permission_is_silent() {
    let meds = vec![daily("Aspirin", &["08:00"])];
    let dispatcher = RecordingDispatcher::new();
    dispatcher.permission.set(Permission::Denied);
    let mut clock = ReminderClock::new(dispatcher, window());

    for now in ["2026-10-16T08:00:00", "2026-10-16T08:00:30"] {
        let report = clock.tick(at(now), &Settings::default(), &meds, &[]);
        assert!(!report.dispatched);
    }
    assert_eq!(clock.dispatcher().sent_count(), 0);

    clock.dispatcher().permission.set(Permission::Granted);
    let report = clock.tick(at("2026-10-16T08:00:45"), &Settings::default(), &meds, &[]);
    assert!(report.dispatched);
}

#[test]
fn notification_action_round_trips_to_snooze() {
    let med = daily("Aspirin", &["08:00"]);
    let mut clock = ReminderClock::new(RecordingDispatcher::new(), window());
    clock.tick(at("2026-10-16T08:00:00"), &Settings::default(), &[med.clone()], &[]);

    let sent = clock.dispatcher().sent.borrow()[0].clone();
    let action = InboundAction::from_notification(ACTION_CONFIRM, &sent.data).unwrap();
    assert_eq!(action.key(), &ObligationKey::new(&med.id, time("08:00")));
    assert_eq!(action.date(), Some(day("2026-10-16")));

    let resume = clock.snooze(action.key().clone(), day("2026-10-16"), at("2026-10-16T08:00:40"), &Settings::default());
    assert!(clock.state().is_snoozed(action.key(), day("2026-10-16"), at("2026-10-16T08:05:00")));
    assert!(!clock.state().is_snoozed(action.key(), day("2026-10-17"), at("2026-10-16T08:05:00")));
    assert_eq!(resume, at("2026-10-16T08:10:40"));
}
