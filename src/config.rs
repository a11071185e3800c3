//! Service configuration.
//!
//! Loaded from a TOML file, with secrets and the API location overridable
//! from the environment (a `.env` file is read first via `dotenv`):
//!
//! - `SENSMON_API_URL`      — overrides `[api] base_url`
//! - `SENSMON_API_TOKEN`    — bearer token for the sensor-data API
//! - `SENSMON_NOTIFY_TOKEN` — bearer token for the notify endpoint
//!
//! Every section and field has a default, so an empty file is valid.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::alert::thresholds::FaultThresholds;
use crate::analysis::window::WindowSettings;
use crate::logging::LogLevel;

pub const ENV_API_URL: &str = "SENSMON_API_URL";
pub const ENV_API_TOKEN: &str = "SENSMON_API_TOKEN";
pub const ENV_NOTIFY_TOKEN: &str = "SENSMON_NOTIFY_TOKEN";

/// Upper bound for `window.lookback_hours` (100 years).
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 366 * 100;

/// Upper bound for `polling.stale_after_minutes` (100 years).
pub const MAX_STALE_AFTER_MINUTES: u64 = 60 * 24 * 366 * 100;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Only readings from this sensor are processed, if set.
    pub sensor_id: Option<String>,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            sensor_id: None,
            timeout_secs: 30,
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub lookback_hours: i64,
    pub max_entries: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 5,
            max_entries: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub stale_after_minutes: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            stale_after_minutes: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotifyConfig {
    pub endpoint: String,
    #[serde(skip)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub window: WindowConfig,
    pub faults: FaultThresholds,
    pub polling: PollingConfig,
    pub notify: Option<NotifyConfig>,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Cannot parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses TOML text without consulting the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in
    /// production and a map lookup in tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        self.api.token = lookup(ENV_API_TOKEN);
        if let Some(notify) = self.notify.as_mut() {
            notify.token = lookup(ENV_NOTIFY_TOKEN);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.lookback_hours <= 0 {
            return Err(ConfigError::Invalid("window.lookback_hours must be positive".into()));
        }
        if self.window.lookback_hours > MAX_LOOKBACK_HOURS {
            return Err(ConfigError::Invalid(format!(
                "window.lookback_hours must be at most {}",
                MAX_LOOKBACK_HOURS
            )));
        }
        if self.polling.stale_after_minutes > MAX_STALE_AFTER_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "polling.stale_after_minutes must be at most {}",
                MAX_STALE_AFTER_MINUTES
            )));
        }
        if self.window.max_entries == 0 {
            return Err(ConfigError::Invalid("window.max_entries must be positive".into()));
        }
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::Invalid("polling.interval_secs must be positive".into()));
        }
        if self.faults.ph_min >= self.faults.ph_max {
            return Err(ConfigError::Invalid(format!(
                "faults.ph_min ({}) must be below faults.ph_max ({})",
                self.faults.ph_min, self.faults.ph_max
            )));
        }
        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "logging.level {:?} is not one of debug, info, warn, error",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Window settings; an out-of-range lookback (only possible on an
    /// unvalidated config) falls back to the default.
    pub fn window_settings(&self) -> WindowSettings {
        let lookback = chrono::TimeDelta::try_hours(self.window.lookback_hours)
            .unwrap_or_else(|| WindowSettings::default().lookback);
        WindowSettings {
            lookback,
            max_entries: self.window.max_entries,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn log_level(&self) -> LogLevel {
        self.logging.level.parse().unwrap_or(LogLevel::Info)
    }
}

/// Reads `.env`, the TOML file at `path`, then environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    let mut config = Config::from_toml_str(&text)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
