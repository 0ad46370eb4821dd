//! Terminal implementations of the notification and feedback boundaries.

use std::io::Write;

use super::{Feedback, Notification, NotificationDispatcher, Permission};
use crate::error::DoseError;

/// Writes each notification to stdout as one JSON line.
pub struct ConsoleDispatcher;

impl NotificationDispatcher for ConsoleDispatcher {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn dispatch(&self, notification: &Notification) -> Result<(), DoseError> {
        let line = serde_json::to_string(notification)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(|e| DoseError::Dispatch(e.to_string()))
    }
}

/// Rings the terminal bell on stderr for success and warning cues. `tick` is silent.
pub struct TerminalBell {
    pub enabled: bool,
}

impl TerminalBell {
    fn ring(&self, times: usize) {
        if !self.enabled {
            return;
        }
        // best effort: a closed stderr just means no cue
        let _ = std::io::stderr().write_all("\x07".repeat(times).as_bytes());
    }
}

impl Feedback for TerminalBell {
    fn success(&self) {
        self.ring(1);
    }

    fn warning(&self) {
        self.ring(2);
    }
}
