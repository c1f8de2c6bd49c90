// src/settings.rs
//
// Persistent application settings, stored as settings.json in the
// platform config directory. Missing fields fall back to defaults so old
// settings files keep loading after new fields are added.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    /// Device path for the Arduino source (9600 baud), e.g. /dev/ttyUSB0
    #[serde(default)]
    pub arduino_port: Option<String>,
    /// Device path for the RP2350 source (115200 baud), e.g. /dev/ttyACM0
    #[serde(default)]
    pub rp2350_port: Option<String>,
    /// Sampling and redraw cadence for the dashboard
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Samples retained per chart series
    #[serde(default = "default_series_window")]
    pub series_window: usize,
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_sample_interval_ms() -> u64 {
    100
}
fn default_series_window() -> usize {
    600 // one minute of samples at the default cadence
}
fn default_log_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("greendeck")
        .join("logs")
        .to_string_lossy()
        .to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            arduino_port: None,
            rp2350_port: None,
            sample_interval_ms: default_sample_interval_ms(),
            series_window: default_series_window(),
            log_to_file: false,
            log_dir: default_log_dir(),
        }
    }
}

fn get_settings_path() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| "Failed to locate config directory".to_string())?
        .join("greendeck");

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config dir: {}", e))?;

    Ok(config_dir.join("settings.json"))
}

pub fn load_settings() -> Result<AppSettings, String> {
    let settings_path = get_settings_path()?;

    if settings_path.exists() {
        let content = std::fs::read_to_string(&settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        // First run: write defaults so the user has a file to edit
        let settings = AppSettings::default();
        save_settings(&settings)?;
        Ok(settings)
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    let settings_path = get_settings_path()?;

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(&settings_path, content)
        .map_err(|e| format!("Failed to write settings: {}", e))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.arduino_port, None);
        assert_eq!(settings.rp2350_port, None);
        assert_eq!(settings.sample_interval_ms, 100);
        assert_eq!(settings.series_window, 600);
        assert!(!settings.log_to_file);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"arduino_port": "/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(settings.arduino_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.rp2350_port, None);
        assert_eq!(settings.sample_interval_ms, 100);
        assert_eq!(settings.series_window, 600);
    }

    #[test]
    fn test_round_trip() {
        let mut settings = AppSettings::default();
        settings.rp2350_port = Some("/dev/ttyACM1".to_string());
        settings.sample_interval_ms = 250;

        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
