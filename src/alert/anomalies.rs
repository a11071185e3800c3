//! Sensor anomaly classification.
//!
//! Every reading is checked against each rule independently, so one reading
//! can produce several issues: a fully zeroed reading is both a power loss
//! and an EC/pH dropout, and its zero pH and CO2 are also out of range.
//! Absent channels never fail a comparison; they only count as "zero or
//! absent" where a rule asks for that.

use std::cmp::Ordering;

use serde_json::Value;

use super::thresholds::FaultThresholds;
use crate::ingest::api::readings_from_value;
use crate::logging::{self, Component};
use crate::model::{Issue, IssueKind, MonitorError, SensorReading};

fn zero_or_absent(value: Option<f64>) -> bool {
    value.is_none_or(|v| v == 0.0)
}

fn issue(reading: &SensorReading, kind: IssueKind, details: String) -> Issue {
    Issue {
        kind,
        timestamp: reading.timestamp.clone(),
        details,
        sensor_id: reading.sensor_id.clone(),
    }
}

/// All issues for a single reading, in rule order.
pub fn classify_reading(reading: &SensorReading, thresholds: &FaultThresholds) -> Vec<Issue> {
    let mut issues = Vec::new();

    if reading.temperature == Some(0.0)
        && reading.humidity == Some(0.0)
        && zero_or_absent(reading.co2)
        && zero_or_absent(reading.ec)
        && zero_or_absent(reading.ph)
    {
        issues.push(issue(
            reading,
            IssueKind::PowerLoss,
            "All sensor channels (temperature, humidity, CO2, EC, pH) read 0".to_string(),
        ));
    }

    if zero_or_absent(reading.ec) || zero_or_absent(reading.ph) {
        issues.push(issue(
            reading,
            IssueKind::BatteryDepleted,
            "EC or pH reading is 0 or missing".to_string(),
        ));
    }

    if let Some(ph) = reading.ph.filter(|&ph| thresholds.ph_out_of_range(ph)) {
        issues.push(issue(
            reading,
            IssueKind::SensorFault,
            format!(
                "pH {} is outside the {}-{} range",
                ph, thresholds.ph_min, thresholds.ph_max
            ),
        ));
    }

    if let Some(co2) = reading.co2.filter(|&co2| thresholds.co2_below_floor(co2)) {
        issues.push(issue(
            reading,
            IssueKind::SensorFault,
            format!("CO2 {} ppm is below {} ppm", co2, thresholds.co2_floor_ppm),
        ));
    }

    issues
}

/// Issues for every reading, concatenated in input order.
pub fn classify(readings: &[SensorReading], thresholds: &FaultThresholds) -> Vec<Issue> {
    let issues: Vec<Issue> = readings
        .iter()
        .flat_map(|r| classify_reading(r, thresholds))
        .collect();

    for kind in [IssueKind::PowerLoss, IssueKind::BatteryDepleted, IssueKind::SensorFault] {
        let count = issues.iter().filter(|i| i.kind == kind).count();
        if count > 0 {
            logging::debug(
                Component::Classifier,
                None,
                &format!("{}: {} issues across {} readings", kind, count, readings.len()),
            );
        }
    }
    issues
}

/// Classifies a raw API payload.
///
/// Fails only when the payload is neither an array nor an object wrapping a
/// `data` array; malformed individual records are scanned as absent channels.
pub fn classify_payload(
    payload: &Value,
    thresholds: &FaultThresholds,
) -> Result<Vec<Issue>, MonitorError> {
    let readings = readings_from_value(payload)?;
    Ok(classify(&readings, thresholds))
}

/// Re-sorts issues newest first for history display.
///
/// Issues with equal timestamps keep their order; issues whose timestamp
/// cannot be parsed go last.
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        let a_at = a.timestamp.as_deref().and_then(crate::model::parse_timestamp);
        let b_at = b.timestamp.as_deref().and_then(crate::model::parse_timestamp);
        match (a_at, b_at) {
            (Some(a_at), Some(b_at)) => b_at.cmp(&a_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(
        temperature: Option<f64>,
        humidity: Option<f64>,
        co2: Option<f64>,
        ec: Option<f64>,
        ph: Option<f64>,
    ) -> SensorReading {
        SensorReading {
            sensor_id: Some("AM2315".to_string()),
            timestamp: Some("2025-02-21T22:29:57Z".to_string()),
            temperature,
            humidity,
            co2,
            ec,
            ph,
            ..Default::default()
        }
    }

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    // --- Rule multiplicity --------------------------------------------------

    #[test]
    fn test_all_zero_reading_yields_four_issues() {
        let r = reading(Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0));
        let issues = classify_reading(&r, &FaultThresholds::default());
        assert_eq!(
            kinds(&issues),
            vec![
                IssueKind::PowerLoss,
                IssueKind::BatteryDepleted,
                IssueKind::SensorFault,
                IssueKind::SensorFault,
            ]
        );
        assert!(issues[2].details.contains("pH"));
        assert!(issues[3].details.contains("CO2"));
        assert!(issues.iter().all(|i| i.timestamp.as_deref() == Some("2025-02-21T22:29:57Z")));
    }

    #[test]
    fn test_healthy_reading_yields_nothing() {
        let r = reading(Some(25.0), Some(50.0), Some(400.0), Some(1.2), Some(7.0));
        assert!(classify_reading(&r, &FaultThresholds::default()).is_empty());
    }

    #[test]
    fn test_power_loss_with_absent_secondary_channels() {
        let r = reading(Some(0.0), Some(0.0), None, None, None);
        let issues = classify_reading(&r, &FaultThresholds::default());
        // Absent pH and CO2 cannot be out of range.
        assert_eq!(kinds(&issues), vec![IssueKind::PowerLoss, IssueKind::BatteryDepleted]);
    }

    #[test]
    fn test_power_loss_requires_zero_climate() {
        let r = reading(None, Some(0.0), None, None, None);
        let issues = classify_reading(&r, &FaultThresholds::default());
        assert_eq!(kinds(&issues), vec![IssueKind::BatteryDepleted]);
    }

    #[test]
    fn test_power_loss_blocked_by_live_co2() {
        let r = reading(Some(0.0), Some(0.0), Some(420.0), Some(0.0), Some(0.0));
        let issues = classify_reading(&r, &FaultThresholds::default());
        assert!(!kinds(&issues).contains(&IssueKind::PowerLoss));
    }

    // --- Single-rule cases --------------------------------------------------

    #[test]
    fn test_zero_ec_alone_is_battery_depleted() {
        let r = reading(Some(24.0), Some(55.0), Some(450.0), Some(0.0), Some(6.5));
        assert_eq!(
            kinds(&classify_reading(&r, &FaultThresholds::default())),
            vec![IssueKind::BatteryDepleted]
        );
    }

    #[test]
    fn test_missing_ph_alone_is_battery_depleted() {
        let r = reading(Some(24.0), Some(55.0), Some(450.0), Some(1.1), None);
        assert_eq!(
            kinds(&classify_reading(&r, &FaultThresholds::default())),
            vec![IssueKind::BatteryDepleted]
        );
    }

    #[test]
    fn test_high_ph_is_sensor_fault() {
        let r = reading(Some(24.0), Some(55.0), Some(450.0), Some(1.1), Some(11.2));
        let issues = classify_reading(&r, &FaultThresholds::default());
        assert_eq!(kinds(&issues), vec![IssueKind::SensorFault]);
        assert_eq!(issues[0].details, "pH 11.2 is outside the 3-10 range");
    }

    #[test]
    fn test_low_co2_is_sensor_fault() {
        let r = reading(Some(24.0), Some(55.0), Some(150.0), Some(1.1), Some(6.5));
        let issues = classify_reading(&r, &FaultThresholds::default());
        assert_eq!(kinds(&issues), vec![IssueKind::SensorFault]);
        assert_eq!(issues[0].details, "CO2 150 ppm is below 200 ppm");
    }

    #[test]
    fn test_custom_thresholds_apply() {
        let strict = FaultThresholds {
            ph_min: 5.5,
            ph_max: 7.5,
            co2_floor_ppm: 350.0,
        };
        let r = reading(Some(24.0), Some(55.0), Some(300.0), Some(1.1), Some(5.0));
        assert_eq!(classify_reading(&r, &strict).len(), 2);
    }

    // --- Batch behaviour ----------------------------------------------------

    #[test]
    fn test_issues_follow_input_order() {
        let mut first = reading(Some(24.0), Some(55.0), Some(150.0), Some(1.1), Some(6.5));
        first.timestamp = Some("2025-02-21T10:00:00Z".to_string());
        let healthy = reading(Some(25.0), Some(50.0), Some(400.0), Some(1.2), Some(7.0));
        let mut last = reading(Some(24.0), Some(55.0), Some(450.0), Some(0.0), Some(6.5));
        last.timestamp = Some("2025-02-21T12:00:00Z".to_string());

        let issues = classify(&[first, healthy, last], &FaultThresholds::default());
        assert_eq!(kinds(&issues), vec![IssueKind::SensorFault, IssueKind::BatteryDepleted]);
        assert_eq!(issues[0].timestamp.as_deref(), Some("2025-02-21T10:00:00Z"));
    }

    #[test]
    fn test_payload_with_mistyped_fields_does_not_fail() {
        let payload = json!({ "data": [
            { "timestamp": "2025-02-21T10:00:00Z", "temperature": "hot", "ph": "7", "co2": null },
            "not even an object",
        ]});
        let issues = classify_payload(&payload, &FaultThresholds::default())
            .expect("record-level garbage is not fatal");
        // Both records have no EC/pH, so both report a dropout and nothing else.
        assert_eq!(kinds(&issues), vec![IssueKind::BatteryDepleted, IssueKind::BatteryDepleted]);
    }

    #[test]
    fn test_payload_without_array_is_malformed() {
        let result = classify_payload(&json!({}), &FaultThresholds::default());
        assert!(matches!(result, Err(MonitorError::MalformedInput(_))));

        let result = classify_payload(&json!("text"), &FaultThresholds::default());
        assert!(matches!(result, Err(MonitorError::MalformedInput(_))));
    }

    #[test]
    fn test_sort_newest_first_is_stable_and_puts_unknown_last() {
        let at = |ts: Option<&str>, kind| Issue {
            kind,
            timestamp: ts.map(String::from),
            details: String::new(),
            sensor_id: None,
        };
        let mut issues = vec![
            at(None, IssueKind::PowerLoss),
            at(Some("2025-02-21T10:00:00Z"), IssueKind::BatteryDepleted),
            at(Some("2025-02-21T12:00:00Z"), IssueKind::PowerLoss),
            at(Some("2025-02-21T12:00:00Z"), IssueKind::BatteryDepleted),
        ];
        sort_newest_first(&mut issues);
        assert_eq!(
            issues.iter().map(|i| (i.timestamp.clone(), i.kind)).collect::<Vec<_>>(),
            vec![
                (Some("2025-02-21T12:00:00Z".to_string()), IssueKind::PowerLoss),
                (Some("2025-02-21T12:00:00Z".to_string()), IssueKind::BatteryDepleted),
                (Some("2025-02-21T10:00:00Z".to_string()), IssueKind::BatteryDepleted),
                (None, IssueKind::PowerLoss),
            ]
        );
    }
}
