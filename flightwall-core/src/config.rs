//! Configuration file management for flightwall.
//!
//! Reads/writes `~/.flightwall/config.toml` with the telemetry API location,
//! poll intervals, rotation timing, history sizing, and observer position.
//! Every key is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{FlightwallError, Result};

/// Full configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preference store location; defaults to `prefs.json` in the config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub rotation: RotationConfig,
    pub display: DisplayConfig,
    pub observer: ObserverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub map_secs: u64,
    pub ticker_secs: u64,
    pub detail_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub period_secs: u64,
    pub progress_tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub settings_idle_secs: u64,
    pub history_capacity: usize,
    pub history_minutes: u32,
    pub ticker_max_distance_km: f64,
    pub chart_width: u32,
    pub chart_height: u32,
    pub pixel_ratio: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://127.0.0.1:5000".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            map_secs: 10,
            ticker_secs: 3,
            detail_secs: 10,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            period_secs: 8,
            progress_tick_ms: 100,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            settings_idle_secs: 5,
            history_capacity: crate::history::DEFAULT_CAPACITY,
            history_minutes: 30,
            ticker_max_distance_km: 150.0,
            chart_width: 480,
            chart_height: 160,
            pixel_ratio: 2.0,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PollingConfig {
    pub fn map(&self) -> Duration {
        Duration::from_secs(self.map_secs)
    }

    pub fn ticker(&self) -> Duration {
        Duration::from_secs(self.ticker_secs)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_secs(self.detail_secs)
    }
}

impl RotationConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

impl DisplayConfig {
    pub fn settings_idle(&self) -> Duration {
        Duration::from_secs(self.settings_idle_secs)
    }
}

impl ObserverConfig {
    /// Observer position, when both coordinates are configured.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

impl Config {
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(|| config_dir().join("prefs.json"))
    }
}

/// Get the config directory path (`~/.flightwall/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".flightwall")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.flightwall/config.toml`.
///
/// Returns default config if the file doesn't exist.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Save config to `~/.flightwall/config.toml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| FlightwallError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)?)
        .map_err(|e| FlightwallError::Config(e.to_string()))
}

pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| FlightwallError::Config(e.to_string()))
}

pub fn serialize_config(config: &Config) -> Result<String> {
    let body =
        toml::to_string_pretty(config).map_err(|e| FlightwallError::Config(e.to_string()))?;
    Ok(format!("# flightwall configuration\n\n{body}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
