use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::dose::types::{Settings, DEFAULT_LOW_STOCK_THRESHOLD};

/// Shortest and longest accepted reminder tick intervals.
pub const TICK_RANGE_SECS: (u64, u64) = (10, 60);

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DoseConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub tick_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Seed values used until the user saves settings of their own.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub notifications_enabled: bool,
    pub snooze_minutes: u32,
    pub remind_before_minutes: u32,
    pub vibration_enabled: bool,
    pub low_stock_threshold: u32,
}

impl Default for DoseConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            tick_interval_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_dosewatch_dir()
            .join("doses.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            notifications_enabled: settings.notifications_enabled,
            snooze_minutes: settings.snooze_minutes,
            remind_before_minutes: settings.remind_before_minutes,
            vibration_enabled: settings.vibration_enabled,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl DefaultsConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            notifications_enabled: self.notifications_enabled,
            snooze_minutes: self.snooze_minutes,
            remind_before_minutes: self.remind_before_minutes,
            vibration_enabled: self.vibration_enabled,
        }
    }
}

/// Returns `~/.dosewatch/`, or `./.dosewatch/` when there is no home directory.
pub fn default_dosewatch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dosewatch")
}

/// Returns the default config file path: `~/.dosewatch/config.toml`
pub fn default_config_path() -> PathBuf {
    default_dosewatch_dir().join("config.toml")
}

impl DoseConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DoseConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (DOSEWATCH_DB, DOSEWATCH_LOG_LEVEL, DOSEWATCH_TICK_SECS).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOSEWATCH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("DOSEWATCH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DOSEWATCH_TICK_SECS") {
            match val.parse() {
                Ok(secs) => self.server.tick_interval_secs = secs,
                Err(_) => tracing::warn!(value = %val, "ignoring non-numeric DOSEWATCH_TICK_SECS"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Reminder tick interval, clamped to [`TICK_RANGE_SECS`].
    pub fn tick_interval(&self) -> Duration {
        let (min, max) = TICK_RANGE_SECS;
        Duration::from_secs(self.server.tick_interval_secs.clamp(min, max))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DoseConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.tick_interval_secs, 30);
        assert_eq!(config.defaults.snooze_minutes, 10);
        assert_eq!(config.defaults.low_stock_threshold, 5);
        assert!(config.storage.db_path.ends_with("doses.db"));
        assert_eq!(config.defaults.settings(), Settings::default());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
tick_interval_secs = 15

[storage]
db_path = "/tmp/test.db"

[defaults]
remind_before_minutes = 5
"#;
        let config: DoseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.defaults.remind_before_minutes, 5);
        // defaults still apply for unset fields
        assert_eq!(config.defaults.snooze_minutes, 10);
        assert_eq!(config.tick_interval(), Duration::from_secs(15));
    }

    #[test]
    fn tick_interval_is_clamped() {
        let mut config = DoseConfig::default();
        config.server.tick_interval_secs = 1;
        assert_eq!(config.tick_interval(), Duration::from_secs(10));
        config.server.tick_interval_secs = 3600;
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = DoseConfig::default();
        std::env::set_var("DOSEWATCH_DB", "/tmp/override.db");
        std::env::set_var("DOSEWATCH_LOG_LEVEL", "trace");
        std::env::set_var("DOSEWATCH_TICK_SECS", "45");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.server.tick_interval_secs, 45);

        // Clean up
        std::env::remove_var("DOSEWATCH_DB");
        std::env::remove_var("DOSEWATCH_LOG_LEVEL");
        std::env::remove_var("DOSEWATCH_TICK_SECS");
    }
}
