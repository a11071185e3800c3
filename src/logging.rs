//! Structured logging for the sensor monitoring service
//!
//! Provides context-rich logging with component and sensor identifiers,
//! timestamps, and severity levels. Supports both console output
//! and file-based logging for long-running polling.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::MonitorError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Api,
    Metrics,
    Classifier,
    Notifier,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Api => write!(f, "API"),
            Component::Metrics => write!(f, "METRICS"),
            Component::Classifier => write!(f, "CLASSIFY"),
            Component::Notifier => write!(f, "NOTIFY"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - session expired, or the backend simply has nothing yet
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, component: Component, sensor_id: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let sensor_part = sensor_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, component, sensor_part, message)
    }

    fn log(&self, level: LogLevel, component: Component, sensor_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, sensor_id, message);
        let sensor_part = sensor_id.map(|s| format!(" [{}]", s)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, sensor_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, sensor_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, component: Component, sensor_id: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, sensor_id, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, sensor_id: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, component, sensor_id, message);
}

/// Log a warning message
pub fn warn(component: Component, sensor_id: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, component, sensor_id, message);
}

/// Log an error message
pub fn error(component: Component, sensor_id: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, component, sensor_id, message);
}

/// Log a debug message
pub fn debug(component: Component, sensor_id: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, component, sensor_id, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a failed fetch cycle
pub fn classify_fetch_failure(err: &MonitorError) -> FailureType {
    match err {
        // Tokens expire; the user signs in again
        MonitorError::Unauthorized => FailureType::Expected,
        // A new device has simply not reported yet
        MonitorError::NoSensorData => FailureType::Expected,
        // 5xx is the backend's problem, anything else is ours
        MonitorError::HttpError(code) if *code >= 500 => FailureType::Unknown,
        MonitorError::HttpError(_) => FailureType::Unexpected,
        // Payload shape changed under us
        MonitorError::MalformedInput(_) => FailureType::Unexpected,
        // Network blips resolve on the next tick
        MonitorError::RequestFailed(_) => FailureType::Unknown,
    }
}

/// Log a fetch failure with automatic classification
pub fn log_fetch_failure(sensor_id: Option<&str>, err: &MonitorError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("Fetch failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Expected => debug(Component::Api, sensor_id, &message),
        FailureType::Unexpected => error(Component::Api, sensor_id, &message),
        FailureType::Unknown => warn(Component::Api, sensor_id, &message),
    }
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one fetch cycle
pub fn log_cycle_summary(sensor_id: Option<&str>, readings: usize, issues: usize) {
    let message = format!(
        "Cycle complete: {} readings, {} issues",
        readings, issues
    );

    if readings == 0 {
        warn(Component::System, sensor_id, &message);
    } else {
        info(Component::System, sensor_id, &message);
    }
}
