//! One fetch → derive → classify cycle.
//!
//! `Monitor` owns no timer. The caller decides when to call `tick_at`, so
//! the same code serves the polling binary, one-shot runs and tests.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::anomalies::classify;
use crate::alert::notify::Notifier;
use crate::alert::thresholds::FaultThresholds;
use crate::analysis::dashboard::{DashboardSnapshot, build_snapshot};
use crate::analysis::hourly::{HourlyAverage, hourly_averages};
use crate::analysis::window::WindowSettings;
use crate::ingest::ReadingSource;
use crate::ingest::api::filter_by_sensor;
use crate::logging::{self, Component};
use crate::model::{Issue, MonitorError, SensorReading, parse_timestamp};

/// Tunables for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub window: WindowSettings,
    pub thresholds: FaultThresholds,
    pub stale_after_minutes: u64,
    pub sensor_id: Option<String>,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            thresholds: FaultThresholds::default(),
            stale_after_minutes: 90,
            sensor_id: None,
        }
    }
}

impl CycleSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            window: config.window_settings(),
            thresholds: config.faults,
            stale_after_minutes: config.polling.stale_after_minutes,
            sensor_id: config.api.sensor_id.clone(),
        }
    }
}

/// Everything the presentation layer needs from one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub generated_at: DateTime<Utc>,
    pub reading_count: usize,
    pub snapshot: DashboardSnapshot,
    /// Statistics view over the whole batch, oldest hour first.
    pub hourly: Vec<HourlyAverage>,
    /// In input order; see `alert::anomalies::sort_newest_first`.
    pub issues: Vec<Issue>,
}

/// Runs the pure part of a cycle over an already-fetched batch.
pub fn run_cycle(readings: &[SensorReading], now: DateTime<Utc>, settings: &CycleSettings) -> CycleReport {
    let snapshot = build_snapshot(readings, now, &settings.window, settings.stale_after_minutes);
    let issues = classify(readings, &settings.thresholds);
    CycleReport {
        generated_at: now,
        reading_count: readings.len(),
        snapshot,
        hourly: hourly_averages(readings),
        issues,
    }
}

pub struct Monitor<S: ReadingSource> {
    source: S,
    settings: CycleSettings,
    notifier: Option<Notifier>,
    /// Newest issue timestamp already pushed to the notifier.
    notified_through: Option<DateTime<Utc>>,
}

impl<S: ReadingSource> Monitor<S> {
    pub fn new(source: S, settings: CycleSettings) -> Self {
        Self {
            source,
            settings,
            notifier: None,
            notified_through: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Fetches once and builds a fresh report.
    ///
    /// Fetch and payload-shape failures abort the cycle with no partial
    /// report; the previous report stays whatever the caller kept.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport, MonitorError> {
        let sensor = self.settings.sensor_id.clone();

        let mut readings = self.source.fetch().inspect_err(|e| {
            logging::log_fetch_failure(sensor.as_deref(), e);
        })?;
        if let Some(id) = sensor.as_deref() {
            readings = filter_by_sensor(readings, id);
        }

        let report = run_cycle(&readings, now, &self.settings);
        logging::log_cycle_summary(sensor.as_deref(), report.reading_count, report.issues.len());

        self.push_new_issues(&report.issues);
        Ok(report)
    }

    /// Issues newer than the last notified timestamp.
    ///
    /// Issues without a parseable timestamp are never pushed, since they
    /// would repeat on every tick.
    pub fn unnotified<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues
            .iter()
            .filter(|issue| {
                match issue.timestamp.as_deref().and_then(parse_timestamp) {
                    Some(at) => self.notified_through.is_none_or(|through| at > through),
                    None => false,
                }
            })
            .collect()
    }

    /// Sends unnotified issues oldest first and moves `notified_through` up
    /// to the newest timestamp whose issues all went out.
    ///
    /// Issues at or after the first failed send stay pending for the next
    /// tick, so an issue sharing that timestamp may be sent twice.
    fn push_new_issues(&mut self, issues: &[Issue]) {
        let mut fresh: Vec<(DateTime<Utc>, Issue)> = self
            .unnotified(issues)
            .into_iter()
            .filter_map(|issue| {
                let at = issue.timestamp.as_deref().and_then(parse_timestamp)?;
                Some((at, issue.clone()))
            })
            .collect();
        if fresh.is_empty() {
            return;
        }
        // Stable: equal timestamps keep classifier order.
        fresh.sort_by_key(|(at, _)| *at);

        let delivered = match &self.notifier {
            Some(notifier) => {
                let batch: Vec<Issue> = fresh.iter().map(|(_, issue)| issue.clone()).collect();
                let delivered = notifier.notify_all(&batch);
                logging::info(
                    Component::Notifier,
                    self.settings.sensor_id.as_deref(),
                    &format!("Sent {}/{} alerts", delivered, batch.len()),
                );
                delivered
            }
            None => fresh.len(),
        };

        let through = match fresh.get(delivered) {
            None => fresh.last().map(|(at, _)| *at),
            Some((failed_at, _)) => fresh[..delivered]
                .iter()
                .map(|(at, _)| *at)
                .filter(|at| at < failed_at)
                .max(),
        };
        if through.is_some() {
            self.notified_through = through;
        }
    }
}
