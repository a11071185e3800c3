//! SensorReading, DerivedMetrics, Issue, MonitorError
//! core data structures and error handling
//!
//! Core data types for the sensor monitoring service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O, only types and the timestamp parsing every consumer
//! agrees on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single record from the sensor-data API.
///
/// Every channel is optional: `None` covers a missing field, an explicit
/// `null` and a value that was not a JSON number. The classifier treats all
/// three as "absent".
///
/// The window selector is stricter: temperature and humidity must each be
/// a number or an explicit `null`. `climate_mistyped` records a record that
/// broke that rule while it was parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(alias = "sensor_id")]
    pub sensor_id: Option<String>,
    pub timestamp: Option<String>, // ISO 8601, e.g. "2025-02-21T22:29:57.000Z"
    pub temperature: Option<f64>,  // °C
    pub humidity: Option<f64>,     // %RH
    #[serde(alias = "CO2")]
    pub co2: Option<f64>, // ppm
    #[serde(alias = "EC")]
    pub ec: Option<f64>, // mS/cm
    #[serde(alias = "pH")]
    pub ph: Option<f64>,
    /// Temperature or humidity was missing, or held something other than a
    /// number or `null`.
    #[serde(skip)]
    pub climate_mistyped: bool,
}

impl SensorReading {
    /// Both climate channels are present, so dew point and VPD can be derived.
    pub fn has_climate(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some()
    }

    /// The reading's timestamp as UTC, if it is present and parseable.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Dew point and vapor pressure deficit for one reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub dew_point: Option<f64>, // °C, 2 dp
    pub vpd: Option<f64>,       // kPa, 2 dp
}

// ---------------------------------------------------------------------------
// Issue types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// Every core channel reads zero at once.
    PowerLoss,
    /// EC or pH dropped out.
    BatteryDepleted,
    /// A channel reports a physically implausible value.
    SensorFault,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::PowerLoss => write!(f, "Power loss"),
            IssueKind::BatteryDepleted => write!(f, "Battery depleted"),
            IssueKind::SensorFault => write!(f, "Sensor fault"),
        }
    }
}

/// One classified problem found in a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub timestamp: Option<String>,
    pub details: String,
    pub sensor_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Advisories and errors
// ---------------------------------------------------------------------------

/// Non-fatal conditions reported alongside a dashboard snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// The fetch succeeded but nothing in it could be displayed.
    DataUnavailable,
    /// Nothing fell inside the lookback window; older readings are shown.
    PartialWindowFallback,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::DataUnavailable => write!(f, "No sensor data available"),
            Advisory::PartialWindowFallback => {
                write!(f, "No data in the lookback window, showing the latest readings instead")
            }
        }
    }
}

/// Errors that abort a whole fetch/derivation cycle.
#[derive(Debug, PartialEq)]
pub enum MonitorError {
    /// Non-2xx HTTP response from the sensor-data API.
    HttpError(u16),
    /// The API rejected the bearer token (HTTP 401).
    Unauthorized,
    /// The request never produced a response (connect, timeout, body read).
    RequestFailed(String),
    /// The response is not an array of readings or an object wrapping one.
    MalformedInput(String),
    /// No reading with a usable timestamp was found.
    NoSensorData,
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::HttpError(code) => write!(f, "HTTP error: {}", code),
            MonitorError::Unauthorized => write!(f, "Session expired: token rejected"),
            MonitorError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            MonitorError::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            MonitorError::NoSensorData => write!(f, "No sensor data"),
        }
    }
}

impl std::error::Error for MonitorError {}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parses the timestamp formats seen from the API and the device scripts.
///
/// Offset-carrying RFC 3339 strings are converted to UTC. Naive date-times
/// (`2025-02-21T22:29:57`, `2025-02-21 22:29:57`) and bare dates are read
/// as UTC. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
