//! Core dose-tracking type definitions.
//!
//! Defines [`TimeOfDay`] and [`Weekdays`] (validated schedule primitives),
//! [`Medication`] and [`Schedule`] (the persisted plan), [`LedgerEntry`] (a
//! confirmation record), [`DoseObligation`] (a derived per-day expectation)
//! and [`Settings`] (user reminder preferences).

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DoseError;

/// Dose description used when a medication has none.
pub const DEFAULT_DOSE: &str = "1 unit";
/// Units consumed per confirmed dose when the medication does not say.
pub const DEFAULT_UNITS_PER_DOSE: u32 = 1;
/// Stock level at or below which a medication counts as running low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

const MINUTES_PER_DAY: u16 = 24 * 60;

// ── Schedule primitives ──────────────────────────────────────────────────────

/// A wall-clock time of day with minute precision, written `HH:MM`.
///
/// Ordering matches the zero-padded string ordering, so `"08:00" < "20:00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, DoseError> {
        if hour > 23 || minute > 59 {
            return Err(DoseError::validation(format!(
                "time out of range: {hour}:{minute:02}"
            )));
        }
        Ok(Self((hour * 60 + minute) as u16))
    }

    /// Truncate a timestamp to its minute of day.
    pub fn of(datetime: &NaiveDateTime) -> Self {
        Self((datetime.hour() * 60 + datetime.minute()) as u16)
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 60)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        u32::from(self.0)
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.minutes_since_midnight() * 60, 0)
            .unwrap_or_default()
    }

    /// This time of day on the given date.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.as_naive_time())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DoseError::validation(format!("invalid time (expected HH:MM): {s:?}"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = DoseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Weekday index of a date, 0 = Sunday through 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A set of weekdays, 0 = Sunday through 6 = Saturday.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Weekdays(u8);

impl Weekdays {
    pub const NONE: Self = Self(0);
    pub const EVERY_DAY: Self = Self(0b111_1111);
    pub const WEEKDAYS: Self = Self(0b011_1110);
    pub const WEEKENDS: Self = Self(0b100_0001);

    pub fn from_days(days: &[u8]) -> Result<Self, DoseError> {
        let mut bits = 0u8;
        for &day in days {
            if day > 6 {
                return Err(DoseError::validation(format!(
                    "weekday out of range (0=Sunday..6=Saturday): {day}"
                )));
            }
            bits |= 1 << day;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, day: u8) -> bool {
        day <= 6 && self.0 & (1 << day) != 0
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(weekday_index(date))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersects(&self, other: Weekdays) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..7u8).filter(move |d| self.contains(*d))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }
}

impl fmt::Debug for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Comma-separated day indices, e.g. `1,2,3,4,5`. This is also the storage format.
impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for Weekdays {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::NONE),
            "daily" => Ok(Self::EVERY_DAY),
            "weekdays" => Ok(Self::WEEKDAYS),
            "weekends" => Ok(Self::WEEKENDS),
            list => {
                let days = list
                    .split(',')
                    .map(|d| {
                        d.trim().parse::<u8>().map_err(|_| {
                            DoseError::validation(format!("invalid weekday: {:?}", d.trim()))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::from_days(&days)
            }
        }
    }
}

impl TryFrom<Vec<u8>> for Weekdays {
    type Error = DoseError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_days(&value)
    }
}

impl From<Weekdays> for Vec<u8> {
    fn from(value: Weekdays) -> Self {
        value.to_vec()
    }
}

// ── Plan ─────────────────────────────────────────────────────────────────────

/// One recurring weekly slot of a medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub time: TimeOfDay,
    pub days: Weekdays,
    /// Per-slot dose override; the medication's default dose applies when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
}

impl Schedule {
    pub fn new(time: TimeOfDay, days: Weekdays) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            time,
            days,
            dose: None,
        }
    }

    pub fn with_dose(mut self, dose: impl Into<String>) -> Self {
        self.dose = Some(dose.into());
        self
    }
}

/// A medication and its weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// UUID v7 primary key.
    pub id: String,
    pub name: String,
    /// Default dose description, e.g. `"1 tablet"`.
    #[serde(alias = "dosage")]
    pub dose: String,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default = "default_true", alias = "enableNotifications")]
    pub alarm_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Remaining units. `None` means stock is not tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_dose: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Medication {
    pub fn new(name: impl Into<String>, dose: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            dose: dose.into(),
            schedules: Vec::new(),
            alarm_enabled: true,
            reminder_message: None,
            notes: None,
            stock: None,
            units_per_dose: None,
            low_stock_threshold: None,
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    pub fn tracks_stock(&self) -> bool {
        self.stock.is_some()
    }

    /// Units consumed per dose; zero or unset falls back to [`DEFAULT_UNITS_PER_DOSE`].
    pub fn effective_units_per_dose(&self) -> u32 {
        self.units_per_dose
            .filter(|u| *u > 0)
            .unwrap_or(DEFAULT_UNITS_PER_DOSE)
    }

    pub fn effective_low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
    }

    /// Check the plan invariants: a name, at least one schedule, and no two
    /// schedules sharing a time on a common weekday.
    pub fn validate(&self) -> Result<(), DoseError> {
        if self.name.trim().is_empty() {
            return Err(DoseError::validation("medication name must not be empty"));
        }
        if self.schedules.is_empty() {
            return Err(DoseError::validation(format!(
                "medication {:?} needs at least one schedule",
                self.name
            )));
        }
        for (i, a) in self.schedules.iter().enumerate() {
            for b in &self.schedules[i + 1..] {
                if a.time == b.time && a.days.intersects(b.days) {
                    return Err(DoseError::validation(format!(
                        "medication {:?} has two schedules at {} on the same day",
                        self.name, a.time
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Dose to take for one slot: the schedule's override, else the medication
/// default, else [`DEFAULT_DOSE`]. Blank strings count as unset.
pub fn effective_dose<'a>(medication: &'a Medication, schedule: &'a Schedule) -> &'a str {
    schedule
        .dose
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| Some(medication.dose.as_str()).filter(|d| !d.trim().is_empty()))
        .unwrap_or(DEFAULT_DOSE)
}

// ── Ledger ───────────────────────────────────────────────────────────────────

/// Outcome recorded for a dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Taken,
    Skipped,
}

impl DoseStatus {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taken => "taken",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseStatus {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taken" => Ok(Self::Taken),
            "skipped" => Ok(Self::Skipped),
            _ => Err(DoseError::validation(format!("unknown dose status: {s}"))),
        }
    }
}

/// A confirmation record in the adherence ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub medication_id: String,
    /// Medication name at confirmation time. Not updated on rename or delete.
    pub medication_name: String,
    /// Local wall-clock time of the confirmation.
    pub taken_at: NaiveDateTime,
    pub status: DoseStatus,
    /// The schedule slot this entry fulfils. Legacy entries have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<TimeOfDay>,
}

impl LedgerEntry {
    pub fn new(
        medication_id: impl Into<String>,
        medication_name: impl Into<String>,
        taken_at: NaiveDateTime,
        status: DoseStatus,
        scheduled_time: Option<TimeOfDay>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            medication_id: medication_id.into(),
            medication_name: medication_name.into(),
            taken_at,
            status,
            scheduled_time,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.taken_at.date()
    }

    pub fn is_taken(&self) -> bool {
        self.status == DoseStatus::Taken
    }
}

// ── Derived ──────────────────────────────────────────────────────────────────

/// Identity of a reminder slot, independent of the date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationKey {
    pub medication_id: String,
    pub time: TimeOfDay,
}

impl ObligationKey {
    pub fn new(medication_id: impl Into<String>, time: TimeOfDay) -> Self {
        Self {
            medication_id: medication_id.into(),
            time,
        }
    }
}

impl fmt::Display for ObligationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.medication_id, self.time)
    }
}

/// One expected dose of one medication on one calendar date. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseObligation {
    pub medication_id: String,
    pub medication_name: String,
    pub schedule_id: String,
    pub time: TimeOfDay,
    pub date: NaiveDate,
    /// Effective dose, see [`effective_dose`].
    pub dose: String,
    pub alarm_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_message: Option<String>,
}

impl DoseObligation {
    pub fn key(&self) -> ObligationKey {
        ObligationKey::new(self.medication_id.clone(), self.time)
    }

    pub fn due_at(&self) -> NaiveDateTime {
        self.time.on(self.date)
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

/// User reminder preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub notifications_enabled: bool,
    #[serde(alias = "snoozeDuration")]
    pub snooze_minutes: u32,
    /// Lead time before a dose; 0 notifies at the scheduled minute.
    pub remind_before_minutes: u32,
    pub vibration_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            snooze_minutes: 10,
            remind_before_minutes: 0,
            vibration_enabled: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), DoseError> {
        if self.snooze_minutes == 0 || self.snooze_minutes > u32::from(MINUTES_PER_DAY) {
            return Err(DoseError::validation(format!(
                "snooze must be between 1 and {MINUTES_PER_DAY} minutes"
            )));
        }
        if self.remind_before_minutes >= u32::from(MINUTES_PER_DAY) {
            return Err(DoseError::validation(format!(
                "pre-reminder lead must be below {MINUTES_PER_DAY} minutes"
            )));
        }
        Ok(())
    }
}
