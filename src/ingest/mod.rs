//! Data sources for sensor readings.
//!
//! - `api` — the device backend's sensor-data endpoint.
//!
//! `dev_mode::DevMode` provides a fixture-backed source for offline work.

use crate::model::{MonitorError, SensorReading};

pub mod api;

/// Anything that can produce one batch of readings per fetch cycle.
pub trait ReadingSource {
    fn fetch(&self) -> Result<Vec<SensorReading>, MonitorError>;
}
