//! Selection of the most recent readings for the headline display.
//!
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally, so selection is deterministic in tests.

use chrono::{DateTime, Duration, Utc};

use crate::model::{MonitorError, SensorReading};

/// How far back to look and how many readings to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSettings {
    pub lookback: Duration,
    pub max_entries: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(5),
            max_entries: 5,
        }
    }
}

/// A reading paired with its parsed timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedReading<'a> {
    pub at: DateTime<Utc>,
    pub reading: &'a SensorReading,
}

/// Result of `select_window`, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection<'a> {
    pub entries: Vec<TimedReading<'a>>,
    /// Nothing was inside the lookback window; `entries` are the newest
    /// readings overall.
    pub used_fallback: bool,
}

impl<'a> WindowSelection<'a> {
    pub fn latest(&self) -> Option<&TimedReading<'a>> {
        self.entries.first()
    }

    pub fn readings(&self) -> Vec<&'a SensorReading> {
        self.entries.iter().map(|e| e.reading).collect()
    }
}

/// Picks up to `max_entries` of the newest readings inside the lookback
/// window, falling back to the newest readings overall when the window is
/// empty.
///
/// Readings without a parseable timestamp, or whose temperature or humidity
/// was neither a number nor `null`, never take part in either the window or
/// the fallback. Readings with equal timestamps keep their input order.
///
/// Returns `MonitorError::NoSensorData` if no reading qualifies.
pub fn select_window<'a>(
    readings: &'a [SensorReading],
    now: DateTime<Utc>,
    settings: &WindowSettings,
) -> Result<WindowSelection<'a>, MonitorError> {
    let mut timed: Vec<TimedReading<'a>> = readings
        .iter()
        .filter(|reading| !reading.climate_mistyped)
        .filter_map(|reading| {
            reading
                .parsed_timestamp()
                .map(|at| TimedReading { at, reading })
        })
        .collect();

    if timed.is_empty() {
        return Err(MonitorError::NoSensorData);
    }

    // Stable sort: ties stay in input order.
    timed.sort_by(|a, b| b.at.cmp(&a.at));

    // A lookback reaching past the representable range keeps everything.
    let cutoff = now
        .checked_sub_signed(settings.lookback)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let windowed: Vec<TimedReading<'a>> = timed
        .iter()
        .filter(|e| e.at >= cutoff)
        .take(settings.max_entries)
        .copied()
        .collect();

    if !windowed.is_empty() {
        return Ok(WindowSelection {
            entries: windowed,
            used_fallback: false,
        });
    }

    timed.truncate(settings.max_entries);
    Ok(WindowSelection {
        entries: timed,
        used_fallback: true,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::api::parse_sensor_payload;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2025-02-21 12:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 21, 12, 0, 0).unwrap()
    }

    fn reading_minutes_ago(minutes: i64, temperature: f64) -> SensorReading {
        let at = fixed_now() - Duration::minutes(minutes);
        SensorReading {
            sensor_id: Some("AM2315".to_string()),
            timestamp: Some(at.to_rfc3339()),
            temperature: Some(temperature),
            humidity: Some(50.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_keeps_five_newest_inside_window() {
        // 10 readings over 6 hours; the oldest 4 are outside the 5-hour window.
        let minutes = [360, 345, 330, 310, 150, 120, 90, 60, 30, 0];
        let readings: Vec<SensorReading> = minutes
            .iter()
            .map(|&m| reading_minutes_ago(m, m as f64))
            .collect();

        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("in-window data should select");

        assert!(!selection.used_fallback);
        let temps: Vec<f64> = selection
            .entries
            .iter()
            .map(|e| e.reading.temperature.unwrap())
            .collect();
        assert_eq!(temps, vec![0.0, 30.0, 60.0, 90.0, 120.0]);
    }

    #[test]
    fn test_reading_exactly_at_cutoff_is_inside_window() {
        let readings = vec![reading_minutes_ago(300, 1.0)];
        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("should select");
        assert!(!selection.used_fallback);
        assert_eq!(selection.entries.len(), 1);
    }

    #[test]
    fn test_falls_back_to_newest_when_window_is_empty() {
        let readings: Vec<SensorReading> = (0..8)
            .map(|i| reading_minutes_ago(600 + i * 60, i as f64))
            .collect();

        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("older data should still select");

        assert!(selection.used_fallback);
        let temps: Vec<f64> = selection
            .readings()
            .iter()
            .map(|r| r.temperature.unwrap())
            .collect();
        assert_eq!(temps, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unparseable_timestamps_are_skipped() {
        let mut broken = reading_minutes_ago(10, 99.0);
        broken.timestamp = Some("yesterday-ish".to_string());
        let mut missing = reading_minutes_ago(10, 98.0);
        missing.timestamp = None;
        let good = reading_minutes_ago(20, 21.0);

        let readings = vec![broken, missing, good];
        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("one valid reading is enough");
        assert_eq!(selection.entries.len(), 1);
        assert_eq!(selection.latest().unwrap().reading.temperature, Some(21.0));
    }

    #[test]
    fn test_no_valid_timestamps_is_no_sensor_data() {
        let readings = vec![SensorReading::default()];
        let result = select_window(&readings, fixed_now(), &WindowSettings::default());
        assert_eq!(result, Err(MonitorError::NoSensorData));

        let result = select_window(&[], fixed_now(), &WindowSettings::default());
        assert_eq!(result, Err(MonitorError::NoSensorData));
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let readings = vec![
            reading_minutes_ago(5, 1.0),
            reading_minutes_ago(5, 2.0),
            reading_minutes_ago(5, 3.0),
        ];
        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("should select");
        let temps: Vec<f64> = selection
            .readings()
            .iter()
            .map(|r| r.temperature.unwrap())
            .collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_null_climate_readings_are_still_selected() {
        let mut nulls = reading_minutes_ago(1, 0.0);
        nulls.temperature = None;
        nulls.humidity = None;
        let readings = vec![nulls];
        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("null channels do not disqualify a reading");
        assert_eq!(selection.entries.len(), 1);
    }

    #[test]
    fn test_mistyped_climate_readings_are_skipped_in_window() {
        let body = r#"[
            {"timestamp": "2025-02-21T11:50:00Z", "temperature": "err"},
            {"timestamp": "2025-02-21T11:40:00Z", "humidity": 55},
            {"timestamp": "2025-02-21T11:00:00Z", "temperature": 20, "humidity": 50}
        ]"#;
        let readings = parse_sensor_payload(body).expect("payload should parse");

        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("one well-typed reading is enough");

        assert!(!selection.used_fallback);
        assert_eq!(selection.entries.len(), 1);
        let latest = selection.latest().unwrap().reading;
        assert_eq!(latest.timestamp.as_deref(), Some("2025-02-21T11:00:00Z"));
        assert_eq!(latest.temperature, Some(20.0));
    }

    #[test]
    fn test_mistyped_climate_readings_are_skipped_in_fallback() {
        let body = r#"[
            {"timestamp": "2025-02-20T11:50:00Z", "temperature": 21, "humidity": "wet"},
            {"timestamp": "2025-02-20T09:00:00Z", "temperature": null, "humidity": null}
        ]"#;
        let readings = parse_sensor_payload(body).expect("payload should parse");

        let selection = select_window(&readings, fixed_now(), &WindowSettings::default())
            .expect("the null reading still qualifies");

        assert!(selection.used_fallback);
        assert_eq!(selection.entries.len(), 1);
        assert_eq!(
            selection.latest().unwrap().reading.timestamp.as_deref(),
            Some("2025-02-20T09:00:00Z")
        );
    }

    #[test]
    fn test_only_mistyped_readings_is_no_sensor_data() {
        let readings = parse_sensor_payload(r#"[{"timestamp": "2025-02-21T11:50:00Z", "temperature": "err"}]"#)
            .expect("payload should parse");
        let result = select_window(&readings, fixed_now(), &WindowSettings::default());
        assert_eq!(result, Err(MonitorError::NoSensorData));
    }

    #[test]
    fn test_lookback_past_representable_range_keeps_everything() {
        let readings = vec![reading_minutes_ago(60 * 24 * 365 * 50, 4.0)];
        let settings = WindowSettings {
            lookback: Duration::days(100_000_000),
            max_entries: 5,
        };
        let selection = select_window(&readings, fixed_now(), &settings).expect("should select");
        assert!(!selection.used_fallback);
        assert_eq!(selection.entries.len(), 1);
    }

    #[test]
    fn test_custom_settings_limit_entries() {
        let readings: Vec<SensorReading> = (0..6).map(|i| reading_minutes_ago(i * 5, i as f64)).collect();
        let settings = WindowSettings {
            lookback: Duration::minutes(12),
            max_entries: 2,
        };
        let selection = select_window(&readings, fixed_now(), &settings).expect("should select");
        assert_eq!(selection.entries.len(), 2);
        assert_eq!(selection.entries[1].reading.temperature, Some(1.0));
    }
}
