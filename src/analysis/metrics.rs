//! Dew point and vapor pressure deficit.
//!
//! Both values are rounded to two decimal places with decimal (not binary)
//! rounding, half away from zero, so every consumer of a reading sees the
//! same digits the device backend stores.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::logging::{self, Component};
use crate::model::{DerivedMetrics, SensorReading};

/// Magnus coefficients for dew point.
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7; // °C

/// Tetens coefficients for saturation vapor pressure (kPa).
const TETENS_E0: f64 = 0.6108;
const TETENS_B: f64 = 237.3; // °C

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricsError {
    /// Division by zero or a non-finite intermediate value.
    ComputationFault { temperature: f64, humidity: f64 },
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::ComputationFault { temperature, humidity } => write!(
                f,
                "Computation fault for temperature {} °C, humidity {} %",
                temperature, humidity
            ),
        }
    }
}

impl std::error::Error for MetricsError {}

/// Rounds to two decimal places using the exact binary value of `value`.
pub fn round2(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

/// Dew point in °C via the Magnus formula.
pub fn dew_point(temperature: f64, humidity: f64) -> Result<f64, MetricsError> {
    let fault = MetricsError::ComputationFault { temperature, humidity };
    let alpha = (MAGNUS_A * temperature) / (MAGNUS_B + temperature) + (humidity / 100.0).ln();
    let denominator = MAGNUS_A - alpha;
    if denominator == 0.0 {
        return Err(fault);
    }
    round2((MAGNUS_B * alpha) / denominator).ok_or(fault)
}

/// Saturation minus actual vapor pressure, in kPa.
pub fn vapor_pressure_deficit(temperature: f64, humidity: f64) -> Result<f64, MetricsError> {
    let saturation = TETENS_E0 * ((MAGNUS_A * temperature) / (temperature + TETENS_B)).exp();
    let actual = saturation * (humidity / 100.0);
    round2(saturation - actual).ok_or(MetricsError::ComputationFault { temperature, humidity })
}

/// Derives both metrics for one reading.
///
/// Absent temperature or humidity yields `None` for both without computing
/// anything. A fault in one formula clears only that field.
pub fn derive_metrics(reading: &SensorReading) -> DerivedMetrics {
    let (Some(temperature), Some(humidity)) = (reading.temperature, reading.humidity) else {
        return DerivedMetrics::default();
    };

    let sensor = reading.sensor_id.as_deref();
    let keep = |result: Result<f64, MetricsError>| match result {
        Ok(value) => Some(value),
        Err(e) => {
            logging::warn(Component::Metrics, sensor, &e.to_string());
            None
        }
    };

    DerivedMetrics {
        dew_point: keep(dew_point(temperature, humidity)),
        vpd: keep(vapor_pressure_deficit(temperature, humidity)),
    }
}

/// `derive_metrics` over a selection, in the same order.
pub fn derive_batch(readings: &[&SensorReading]) -> Vec<DerivedMetrics> {
    readings.iter().map(|r| derive_metrics(r)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(temperature: Option<f64>, humidity: Option<f64>) -> SensorReading {
        SensorReading {
            sensor_id: Some("AM2315".to_string()),
            timestamp: Some("2025-02-21T22:00:00Z".to_string()),
            temperature,
            humidity,
            ..Default::default()
        }
    }

    // --- Reference values ---------------------------------------------------

    #[test]
    fn test_twenty_degrees_fifty_percent() {
        let metrics = derive_metrics(&climate(Some(20.0), Some(50.0)));
        assert_eq!(metrics.dew_point, Some(9.25));
        assert_eq!(metrics.vpd, Some(1.17));
    }

    #[test]
    fn test_warm_humid_reading() {
        assert_eq!(dew_point(25.0, 60.0), Ok(16.68));
        assert_eq!(vapor_pressure_deficit(25.0, 60.0), Ok(1.27));
    }

    #[test]
    fn test_below_freezing_reading() {
        assert_eq!(dew_point(-10.0, 80.0), Ok(-12.78));
        assert_eq!(vapor_pressure_deficit(-10.0, 80.0), Ok(0.06));
    }

    // --- Properties ---------------------------------------------------------

    #[test]
    fn test_dew_point_equals_temperature_at_saturation() {
        for t in [-40.0, -5.5, 0.0, 12.3, 25.0, 38.9] {
            let dp = dew_point(t, 100.0).expect("saturated air should not fault");
            assert!((dp - t).abs() <= 0.1, "dew point {} should track temperature {}", dp, t);
        }
    }

    #[test]
    fn test_vpd_is_never_negative() {
        let mut t = -99.0;
        while t < 100.0 {
            for h in [0.5, 10.0, 33.3, 50.0, 75.2, 99.9, 100.0] {
                let vpd = vapor_pressure_deficit(t, h).expect("finite inputs should not fault");
                assert!(vpd >= 0.0, "vpd({}, {}) = {} is negative", t, h, vpd);
            }
            t += 7.5;
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let reading = climate(Some(27.4), Some(63.1));
        assert_eq!(derive_metrics(&reading), derive_metrics(&reading));
    }

    // --- Absent and faulting inputs -----------------------------------------

    #[test]
    fn test_missing_channel_yields_no_metrics() {
        assert_eq!(derive_metrics(&climate(None, Some(50.0))), DerivedMetrics::default());
        assert_eq!(derive_metrics(&climate(Some(20.0), None)), DerivedMetrics::default());
    }

    #[test]
    fn test_zero_humidity_faults_dew_point_only() {
        // ln(0) is -inf, which drives the Magnus ratio to NaN.
        assert!(dew_point(20.0, 0.0).is_err());
        let metrics = derive_metrics(&climate(Some(20.0), Some(0.0)));
        assert_eq!(metrics.dew_point, None);
        assert_eq!(metrics.vpd, Some(2.34));
    }

    #[test]
    fn test_non_finite_input_is_a_fault() {
        assert!(dew_point(f64::NAN, 50.0).is_err());
        assert!(vapor_pressure_deficit(f64::INFINITY, 50.0).is_err());
    }

    #[test]
    fn test_round2_uses_decimal_half_away_from_zero() {
        assert_eq!(round2(1.005), Some(1.0)); // 1.005 is stored as 1.00499999...
        assert_eq!(round2(2.675), Some(2.67));
        assert_eq!(round2(0.125), Some(0.13));
        assert_eq!(round2(-0.125), Some(-0.13));
        assert_eq!(round2(f64::NAN), None);
    }

    #[test]
    fn test_derive_batch_preserves_order() {
        let a = climate(Some(20.0), Some(50.0));
        let b = climate(None, None);
        let derived = derive_batch(&[&a, &b]);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].vpd, Some(1.17));
        assert_eq!(derived[1], DerivedMetrics::default());
    }
}
