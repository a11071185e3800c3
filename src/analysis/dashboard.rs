//! Headline values and chart series for the dashboard.
//!
//! Built from one window selection per fetch cycle; the previous snapshot is
//! never merged in.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metrics::derive_metrics;
use super::window::{WindowSelection, WindowSettings, select_window};
use crate::alert::stalenesses::is_stale_at;
use crate::logging::{self, Component};
use crate::model::{Advisory, MonitorError, SensorReading};

/// Values for the newest selected reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMetrics {
    pub sensor_id: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub dew_point: Option<f64>,
    pub vpd: Option<f64>,
    pub updated_at: Option<String>,
    /// Older than the configured freshness limit.
    pub stale: bool,
}

/// Parallel per-metric arrays, in selection order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub temperature: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    pub dew_point: Vec<Option<f64>>,
    pub vpd: Vec<Option<f64>>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub latest: Option<LatestMetrics>,
    pub series: ChartSeries,
    pub advisory: Option<Advisory>,
}

impl DashboardSnapshot {
    fn unavailable() -> Self {
        Self {
            advisory: Some(Advisory::DataUnavailable),
            ..Default::default()
        }
    }
}

/// Builds the chart series for a selection.
pub fn build_series(selection: &WindowSelection<'_>) -> ChartSeries {
    let mut series = ChartSeries::default();
    for entry in &selection.entries {
        let reading = entry.reading;
        let derived = derive_metrics(reading);
        series
            .labels
            .push(reading.timestamp.clone().unwrap_or_else(|| entry.at.to_rfc3339()));
        series.temperature.push(reading.temperature);
        series.humidity.push(reading.humidity);
        series.dew_point.push(derived.dew_point);
        series.vpd.push(derived.vpd);
    }
    series
}

/// Selects the window, derives metrics and assembles the snapshot.
///
/// A batch with no usable reading is not an error here: the snapshot comes
/// back empty with `Advisory::DataUnavailable`.
pub fn build_snapshot(
    readings: &[SensorReading],
    now: DateTime<Utc>,
    window: &WindowSettings,
    stale_after_minutes: u64,
) -> DashboardSnapshot {
    let selection = match select_window(readings, now, window) {
        Ok(selection) => selection,
        Err(MonitorError::NoSensorData) => {
            logging::warn(Component::Metrics, None, &Advisory::DataUnavailable.to_string());
            return DashboardSnapshot::unavailable();
        }
        Err(e) => {
            logging::error(Component::Metrics, None, &e.to_string());
            return DashboardSnapshot::unavailable();
        }
    };

    let advisory = if selection.used_fallback {
        logging::warn(Component::Metrics, None, &Advisory::PartialWindowFallback.to_string());
        Some(Advisory::PartialWindowFallback)
    } else {
        None
    };

    let latest = selection.latest().map(|entry| {
        let reading = entry.reading;
        let derived = derive_metrics(reading);
        LatestMetrics {
            sensor_id: reading.sensor_id.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            dew_point: derived.dew_point,
            vpd: derived.vpd,
            updated_at: reading.timestamp.clone(),
            // Selected readings always carry a parseable timestamp.
            stale: is_stale_at(reading, stale_after_minutes, now).unwrap_or(true),
        }
    });

    DashboardSnapshot {
        latest,
        series: build_series(&selection),
        advisory,
    }
}
