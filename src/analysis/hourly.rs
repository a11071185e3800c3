//! Hourly averages for the statistics view.
//!
//! Readings are bucketed by UTC clock hour. Temperature and humidity are
//! averaged separately over the readings that report them; dew point and
//! VPD are then derived from the averaged pair.

use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;

use super::metrics::derive_metrics;
use crate::model::{DerivedMetrics, SensorReading};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyAverage {
    pub hour: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub derived: DerivedMetrics,
    /// Readings that fell into this hour, whatever they reported.
    pub sample_count: usize,
}

#[derive(Default)]
struct Accumulator {
    temperature_sum: f64,
    temperature_count: usize,
    humidity_sum: f64,
    humidity_count: usize,
    samples: usize,
}

fn mean(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Averages readings per hour, oldest hour first.
///
/// Readings without a parseable timestamp are skipped.
pub fn hourly_averages(readings: &[SensorReading]) -> Vec<HourlyAverage> {
    let mut buckets: BTreeMap<DateTime<Utc>, Accumulator> = BTreeMap::new();

    for reading in readings {
        let Some(at) = reading.parsed_timestamp() else {
            continue;
        };
        let Ok(hour) = at.duration_trunc(TimeDelta::hours(1)) else {
            continue;
        };
        let acc = buckets.entry(hour).or_default();
        acc.samples += 1;
        if let Some(t) = reading.temperature {
            acc.temperature_sum += t;
            acc.temperature_count += 1;
        }
        if let Some(h) = reading.humidity {
            acc.humidity_sum += h;
            acc.humidity_count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(hour, acc)| {
            let temperature = mean(acc.temperature_sum, acc.temperature_count);
            let humidity = mean(acc.humidity_sum, acc.humidity_count);
            let derived = derive_metrics(&SensorReading {
                temperature,
                humidity,
                ..Default::default()
            });
            HourlyAverage {
                hour,
                temperature,
                humidity,
                derived,
                sample_count: acc.samples,
            }
        })
        .collect()
}
