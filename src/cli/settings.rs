use anyhow::Result;

use crate::config::DoseConfig;
use crate::dose::types::Settings;
use crate::store::Store;

/// Values for `settings set`; `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub notifications_enabled: Option<bool>,
    pub snooze_minutes: Option<u32>,
    pub remind_before_minutes: Option<u32>,
    pub vibration_enabled: Option<bool>,
}

impl SettingsUpdate {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = self.notifications_enabled {
            settings.notifications_enabled = v;
        }
        if let Some(v) = self.snooze_minutes {
            settings.snooze_minutes = v;
        }
        if let Some(v) = self.remind_before_minutes {
            settings.remind_before_minutes = v;
        }
        if let Some(v) = self.vibration_enabled {
            settings.vibration_enabled = v;
        }
        settings
    }
}

fn print(settings: &Settings) {
    println!("Reminder Settings");
    println!("{}", "=".repeat(40));
    println!("  Notifications:       {}", on_off(settings.notifications_enabled));
    println!("  Snooze:              {} min", settings.snooze_minutes);
    println!("  Remind before:       {} min", settings.remind_before_minutes);
    println!("  Vibration:           {}", on_off(settings.vibration_enabled));
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}

pub fn show(config: &DoseConfig) -> Result<()> {
    let store = super::open_store(config)?;
    print(&store.settings()?);
    Ok(())
}

pub fn set(config: &DoseConfig, update: SettingsUpdate) -> Result<()> {
    let store = super::open_store(config)?;
    let settings = update.apply(store.settings()?);
    store.save_settings(&settings)?;
    print(&settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_touches_only_given_fields() {
        let update = SettingsUpdate {
            remind_before_minutes: Some(15),
            ..Default::default()
        };
        let updated = update.apply(Settings::default());
        assert_eq!(updated.remind_before_minutes, 15);
        assert_eq!(updated.snooze_minutes, 10);
        assert!(updated.notifications_enabled);
    }
}
