//! Schedule resolution: expand weekly schedules into the dose obligations of one date.

use chrono::NaiveDate;

use super::types::{effective_dose, DoseObligation, Medication};

/// Expand every schedule that runs on `date`'s weekday into one obligation.
///
/// Output is sorted by time of day, then medication name, then medication id
/// so identical inputs always give identical output. Medications without
/// schedules and schedules with no days contribute nothing.
pub fn resolve_for_date(medications: &[Medication], date: NaiveDate) -> Vec<DoseObligation> {
    let mut obligations: Vec<DoseObligation> = medications
        .iter()
        .flat_map(|med| {
            med.schedules
                .iter()
                .filter(move |s| s.days.contains_date(date))
                .map(move |schedule| DoseObligation {
                    medication_id: med.id.clone(),
                    medication_name: med.name.clone(),
                    schedule_id: schedule.id.clone(),
                    time: schedule.time,
                    date,
                    dose: effective_dose(med, schedule).to_string(),
                    alarm_enabled: med.alarm_enabled,
                    reminder_message: med.reminder_message.clone(),
                })
        })
        .collect();

    obligations.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.medication_name.cmp(&b.medication_name))
            .then_with(|| a.medication_id.cmp(&b.medication_id))
    });
    obligations
}

/// Number of obligations `date` carries, without materializing them.
pub fn expected_count(medications: &[Medication], date: NaiveDate) -> usize {
    medications
        .iter()
        .flat_map(|m| m.schedules.iter())
        .filter(|s| s.days.contains_date(date))
        .count()
}
