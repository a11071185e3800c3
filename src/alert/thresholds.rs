//! Physical-range limits used by the anomaly classifier.
//!
//! Readings outside these limits are treated as a broken sensor rather than
//! a real environmental value.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FaultThresholds {
    /// Lowest plausible pH.
    pub ph_min: f64,
    /// Highest plausible pH.
    pub ph_max: f64,
    /// Below-ambient CO2 floor, in ppm.
    pub co2_floor_ppm: f64,
}

impl Default for FaultThresholds {
    fn default() -> Self {
        Self {
            ph_min: 3.0,
            ph_max: 10.0,
            co2_floor_ppm: 200.0,
        }
    }
}

impl FaultThresholds {
    pub fn ph_out_of_range(&self, ph: f64) -> bool {
        ph < self.ph_min || ph > self.ph_max
    }

    pub fn co2_below_floor(&self, co2: f64) -> bool {
        co2 < self.co2_floor_ppm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ph_bounds_are_exclusive() {
        let t = FaultThresholds::default();
        assert!(!t.ph_out_of_range(3.0));
        assert!(!t.ph_out_of_range(10.0));
        assert!(t.ph_out_of_range(2.99));
        assert!(t.ph_out_of_range(10.01));
    }

    #[test]
    fn test_co2_floor_is_strict() {
        let t = FaultThresholds::default();
        assert!(!t.co2_below_floor(200.0));
        assert!(t.co2_below_floor(199.9));
    }
}
