//! Sensor-data API client
//!
//! Retrieves the stored readings for the signed-in user from the device
//! backend:
//!
//!   GET {base_url}/api/user/sensor-data
//!   Authorization: Bearer <token>
//!
//! The backend answers `{ "data": [...] }`; older call sites and the mock
//! feeds return a bare array. Both shapes are accepted.

use std::time::Duration;

use serde_json::{Map, Value};

use super::ReadingSource;
use crate::model::{MonitorError, SensorReading};

const SENSOR_DATA_PATH: &str = "/api/user/sensor-data";

// ============================================================================
// URL construction
// ============================================================================

pub fn build_sensor_data_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SENSOR_DATA_PATH)
}

// ============================================================================
// Payload parsing
// ============================================================================

/// Parses a response body into readings.
///
/// # Errors
/// `MonitorError::MalformedInput` if the body is not JSON, or is JSON that
/// is neither an array nor an object with a `data` array.
pub fn parse_sensor_payload(body: &str) -> Result<Vec<SensorReading>, MonitorError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| MonitorError::MalformedInput(format!("invalid JSON: {}", e)))?;
    readings_from_value(&value)
}

/// Extracts readings from an already-decoded payload.
///
/// Individual records are read leniently: a field that is missing, `null`
/// or of the wrong type becomes `None`, and a record that is not an object
/// becomes a reading with every channel absent. Records whose temperature or
/// humidity is not a number or `null` are flagged `climate_mistyped`.
pub fn readings_from_value(value: &Value) -> Result<Vec<SensorReading>, MonitorError> {
    let records = match value {
        Value::Array(records) => records,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(MonitorError::MalformedInput(
                    "`data` field is not an array".to_string(),
                ));
            }
            None => {
                return Err(MonitorError::MalformedInput(
                    "object has no `data` array".to_string(),
                ));
            }
        },
        other => {
            return Err(MonitorError::MalformedInput(format!(
                "expected an array of readings, got {}",
                json_kind(other)
            )));
        }
    };

    Ok(records.iter().map(reading_from_record).collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// First numeric value found under any of `keys`.
fn number_field(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(Value::as_f64)
        .filter(|v| v.is_finite())
}

fn string_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(Value::as_str)
        .map(String::from)
}

/// A number or an explicit `null`; a missing key or any other type fails.
fn number_or_null(record: &Map<String, Value>, key: &str) -> bool {
    matches!(record.get(key), Some(Value::Number(_) | Value::Null))
}

fn reading_from_record(record: &Value) -> SensorReading {
    let Some(record) = record.as_object() else {
        return SensorReading {
            climate_mistyped: true,
            ..Default::default()
        };
    };

    SensorReading {
        sensor_id: string_field(record, &["sensorId", "sensor_id"]),
        timestamp: string_field(record, &["timestamp"]),
        temperature: number_field(record, &["temperature"]),
        humidity: number_field(record, &["humidity"]),
        co2: number_field(record, &["co2", "CO2"]),
        ec: number_field(record, &["ec", "EC"]),
        ph: number_field(record, &["ph", "pH"]),
        climate_mistyped: !(number_or_null(record, "temperature") && number_or_null(record, "humidity")),
    }
}

/// Keeps only the readings reported by `sensor_id`.
pub fn filter_by_sensor(readings: Vec<SensorReading>, sensor_id: &str) -> Vec<SensorReading> {
    readings
        .into_iter()
        .filter(|r| r.sensor_id.as_deref() == Some(sensor_id))
        .collect()
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking client for the sensor-data endpoint.
pub struct ApiClient {
    client: reqwest::blocking::Client,
    url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: build_sensor_data_url(base_url),
            token: token.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReadingSource for ApiClient {
    fn fetch(&self) -> Result<Vec<SensorReading>, MonitorError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| MonitorError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MonitorError::Unauthorized);
        }
        if !status.is_success() {
            return Err(MonitorError::HttpError(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| MonitorError::RequestFailed(e.to_string()))?;
        parse_sensor_payload(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================
