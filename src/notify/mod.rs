//! Notification dispatch boundary and user feedback collaborator.
//!
//! The engine never talks to an OS notification service directly. It hands
//! [`Notification`]s to a [`NotificationDispatcher`] and receives the user's
//! choice back as an [`InboundAction`]. [`Feedback`] covers fire-and-forget
//! haptic/audible cues.

pub mod console;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dose::types::ObligationKey;
use crate::error::DoseError;

/// Action id offered on single-dose notifications to confirm the dose.
pub const ACTION_CONFIRM: &str = "confirm";
/// Action id offered on single-dose notifications to postpone the reminder.
pub const ACTION_SNOOZE: &str = "snooze";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet; treated like `Denied` when dispatching.
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag.
    pub tag: String,
    pub actions: Vec<NotificationAction>,
    pub vibrate: bool,
    /// Opaque payload echoed back with the user's action.
    pub data: serde_json::Value,
}

pub trait NotificationDispatcher {
    fn permission(&self) -> Permission;

    fn dispatch(&self, notification: &Notification) -> Result<(), DoseError>;
}

/// A user's response to a notification.
///
/// `date` is the obligation's calendar date. A pre-reminder sent before
/// midnight belongs to tomorrow's dose, so the action has to say which day
/// it answers; without it the action applies to today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundAction {
    Confirm {
        #[serde(rename = "obligationKey")]
        obligation_key: ObligationKey,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<NaiveDate>,
    },
    Snooze {
        #[serde(rename = "obligationKey")]
        obligation_key: ObligationKey,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<NaiveDate>,
    },
}

impl InboundAction {
    pub fn key(&self) -> &ObligationKey {
        match self {
            Self::Confirm { obligation_key, .. } | Self::Snooze { obligation_key, .. } => {
                obligation_key
            }
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Confirm { date, .. } | Self::Snooze { date, .. } => *date,
        }
    }

    /// Rebuild the action from a clicked action id and the notification payload.
    pub fn from_notification(action_id: &str, data: &serde_json::Value) -> Option<Self> {
        let obligation_key: ObligationKey =
            serde_json::from_value(data.get("obligationKey")?.clone()).ok()?;
        let date = data
            .get("date")
            .and_then(|d| serde_json::from_value::<NaiveDate>(d.clone()).ok());
        match action_id {
            ACTION_CONFIRM => Some(Self::Confirm {
                obligation_key,
                date,
            }),
            ACTION_SNOOZE => Some(Self::Snooze {
                obligation_key,
                date,
            }),
            _ => None,
        }
    }
}

/// Haptic or audible cues. Every method is a no-op unless overridden.
pub trait Feedback {
    fn tick(&self) {}

    fn success(&self) {}

    fn warning(&self) {}
}

/// Feedback sink for hosts without any cue support.
pub struct NoFeedback;

impl Feedback for NoFeedback {}
