//! Development mode utilities for working with historical data
//!
//! When the device backend is unavailable, use this module to replay a
//! saved sensor-data payload for testing and development.

use std::fs;
use std::path::PathBuf;

use chrono::TimeDelta;

use crate::ingest::ReadingSource;
use crate::logging::{self, Component};
use crate::ingest::api::parse_sensor_payload;
use crate::model::{MonitorError, SensorReading};

/// Configuration for development mode data replay
pub struct DevMode {
    /// JSON fixture in either API shape (bare array or `{ "data": [...] }`)
    pub fixture: PathBuf,
    /// Shift readings forward by this many days so they look current
    pub days_offset: i64,
}

impl DevMode {
    /// Create a new dev mode configuration
    ///
    /// # Arguments
    /// * `fixture` - Saved sensor-data response to replay
    /// * `days_offset` - Move every timestamp this many days forward
    pub fn new(fixture: impl Into<PathBuf>, days_offset: i64) -> Self {
        Self {
            fixture: fixture.into(),
            days_offset,
        }
    }

    /// Moves a reading's timestamp forward by `days_offset`.
    ///
    /// Readings whose timestamp does not parse, or would leave the
    /// representable range once shifted, are replayed unchanged.
    pub fn shift_reading(&self, mut reading: SensorReading) -> SensorReading {
        let Some(at) = reading.parsed_timestamp() else {
            return reading;
        };
        match TimeDelta::try_days(self.days_offset).and_then(|offset| at.checked_add_signed(offset)) {
            Some(shifted) => reading.timestamp = Some(shifted.to_rfc3339()),
            None => logging::warn(
                Component::System,
                reading.sensor_id.as_deref(),
                &format!("Cannot shift {} by {} days", at, self.days_offset),
            ),
        }
        reading
    }
}

impl ReadingSource for DevMode {
    fn fetch(&self) -> Result<Vec<SensorReading>, MonitorError> {
        let body = fs::read_to_string(&self.fixture).map_err(|e| {
            MonitorError::RequestFailed(format!("{}: {}", self.fixture.display(), e))
        })?;
        let readings = parse_sensor_payload(&body)?;
        Ok(readings.into_iter().map(|r| self.shift_reading(r)).collect())
    }
}
