//! Reading staleness detection.
//!
//! The device backend stores a reading every hour under normal conditions.
//! A dashboard that keeps showing the last good value after the sensor has
//! gone quiet is misleading, so the headline carries a staleness flag.
//!
//! # Clock injection
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally. This makes staleness purely deterministic in
//! tests without mocking or time manipulation.

use chrono::{DateTime, Utc};

use crate::model::SensorReading;

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if the reading's timestamp is older than `max_age_minutes`
/// relative to `now`.
///
/// Staleness is defined as strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// Returns an error if the reading has no parseable timestamp.
/// Callers should treat parse failures as stale (fail-safe default).
pub fn is_stale_at(
    reading: &SensorReading,
    max_age_minutes: u64,
    now: DateTime<Utc>,
) -> Result<bool, String> {
    let raw = reading.timestamp.as_deref().unwrap_or_default();
    let reading_time = crate::model::parse_timestamp(raw)
        .ok_or_else(|| format!("Unparseable timestamp: {:?}", raw))?;

    // Readings stamped in the future are treated as fresh.
    let age_minutes = (now - reading_time).num_minutes().max(0) as u64;
    Ok(age_minutes > max_age_minutes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
