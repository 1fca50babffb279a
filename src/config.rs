use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PORT: &str = "/dev/tty.usbmodem14601";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_WINDOW_LEN: usize = 500;
pub const DEFAULT_Y_RANGE: (f64, f64) = (-190.0, 190.0);
pub const DEFAULT_TICK_MS: u64 = 20;

// ---------------- Settings file ----------------

/// Runtime settings. Every field has a compiled-in default; an optional
/// `settings.json` may override any subset of them. The file is never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port_name: String,
    pub baud_rate: u32,
    pub window_len: usize,
    pub y_min: f64,
    pub y_max: f64,
    pub tick_ms: u64,
    /// Consecutive empty reads tolerated before shutting down.
    /// 1 means the first empty read ends the session.
    pub idle_ticks_before_exit: u32,
    pub json_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            window_len: DEFAULT_WINDOW_LEN,
            y_min: DEFAULT_Y_RANGE.0,
            y_max: DEFAULT_Y_RANGE.1,
            tick_ms: DEFAULT_TICK_MS,
            idle_ticks_before_exit: 1,
            json_logs: false,
        }
    }
}

impl Settings {
    /// `<config dir>/pendulum-plot/settings.json`, falling back to the
    /// current directory when the platform has no config dir.
    pub fn settings_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pendulum-plot")
            .join("settings.json")
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::settings_path())
    }

    /// Defaults when `path` does not exist; otherwise the file's values
    /// layered over the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_name.trim().is_empty() {
            return Err(ConfigError::Invalid("port_name is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if self.window_len < 2 {
            return Err(ConfigError::Invalid(format!(
                "window_len must be at least 2, got {}",
                self.window_len
            )));
        }
        if !(self.y_min < self.y_max) {
            return Err(ConfigError::Invalid(format!(
                "y_min ({}) must be below y_max ({})",
                self.y_min, self.y_max
            )));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".into()));
        }
        if self.idle_ticks_before_exit == 0 {
            return Err(ConfigError::Invalid(
                "idle_ticks_before_exit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.window_len, 500);
        assert_eq!(settings.tick_interval(), Duration::from_millis(20));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "port_name": "/dev/ttyACM0", "idle_ticks_before_exit": 5 }"#)
            .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.port_name, "/dev/ttyACM0");
        assert_eq!(settings.idle_ticks_before_exit, 5);
        assert_eq!(settings.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(settings.y_min, -190.0);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn inverted_axis_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "y_min": 10.0, "y_max": -10.0 }"#).unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_idle_ticks_is_rejected() {
        let settings = Settings {
            idle_ticks_before_exit: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
