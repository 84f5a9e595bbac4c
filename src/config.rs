//! Configuration for the vplan service.
//!
//! Loaded from a TOML file; every section and field has a default, so a
//! missing file or a partial file is fine. Defaults mirror the deployed
//! system: port 3000, 17:00 cutoff, 03:00 backup, 30-minute refresh,
//! a 3-day/4-day window, and 3 seconds between upstream requests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PlanError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Upstream plan source settings.
    pub source: SourceConfig,
    /// Retry stage delays for upstream fetches.
    pub retry: RetryConfig,
    /// Date resolution and window settings.
    pub calendar: CalendarConfig,
    /// Background refresh settings.
    pub refresh: RefreshConfig,
    /// Cache store settings.
    pub store: StoreConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (use port `0` for auto-assign in tests).
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Directory of static client assets served at `/`.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            static_dir: PathBuf::from("public"),
        }
    }
}

/// Upstream plan source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Endpoint receiving the form POST.
    pub url: String,
    /// Course filter sent as the `kurs` form field. `Alle` requests the
    /// whole plan.
    pub course_filter: String,
    /// User-Agent header for upstream requests.
    pub user_agent: String,
    /// Per-request network timeout in seconds.
    pub timeout_secs: u64,
    /// Minimum interval between upstream requests in milliseconds,
    /// measured from the last successful fetch.
    pub min_request_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://vertretung.bababue.com/query".to_owned(),
            course_filter: "Alle".to_owned(),
            // The upstream rejects browser-looking requests; plain curl works.
            user_agent: "curl/8.5.0".to_owned(),
            timeout_secs: 30,
            min_request_interval_ms: 3_000,
        }
    }
}

/// Staged retry delays (see `retry::RetrySchedule`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay between the first three attempts, in milliseconds.
    pub short_ms: u64,
    /// Delay before the fourth attempt.
    pub medium_ms: u64,
    /// Delay before the fifth and final attempt.
    pub long_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            short_ms: 1_000,
            medium_ms: 5_000,
            long_ms: 10_000,
        }
    }
}

/// Date resolution and window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Local hour from which queries refer to the next school day.
    pub cutoff_hour: u32,
    /// The institution's zone as a fixed offset from UTC, in minutes.
    /// Default +60 (Berlin standard time). Daylight saving is not
    /// tracked; adjust the offset if the one-hour shift matters.
    pub utc_offset_minutes: i32,
    /// School days kept before the effective date.
    pub window_back: usize,
    /// School days kept after the effective date.
    pub window_forward: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            cutoff_hour: 17,
            utc_offset_minutes: 60,
            window_back: 3,
            window_forward: 4,
        }
    }
}

/// Background refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between periodic window refreshes.
    pub interval_secs: u64,
    /// Local hour of the daily backup run.
    pub backup_hour: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1_800,
            backup_hour: 3,
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the per-date snapshot files. Created on startup.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PlanError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed. Used by the server binary to write a starter config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/vplan/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("vplan").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("vplan")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/vplan-config/config.toml")
        }
    }

    /// Validate the configuration, returning a specific message for the
    /// first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Config`] describing the invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(PlanError::Config("source.url must not be empty".into()));
        }
        if !self.source.url.starts_with("http://") && !self.source.url.starts_with("https://") {
            return Err(PlanError::Config(
                "source.url must start with http:// or https://".into(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(PlanError::Config(
                "source.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.calendar.cutoff_hour > 23 {
            return Err(PlanError::Config(
                "calendar.cutoff_hour must be between 0 and 23".into(),
            ));
        }
        if self.calendar.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(PlanError::Config(
                "calendar.utc_offset_minutes must be within a day".into(),
            ));
        }
        if self.refresh.interval_secs == 0 {
            return Err(PlanError::Config(
                "refresh.interval_secs must be greater than 0".into(),
            ));
        }
        if self.refresh.backup_hour > 23 {
            return Err(PlanError::Config(
                "refresh.backup_hour must be between 0 and 23".into(),
            ));
        }
        Ok(())
    }
}
