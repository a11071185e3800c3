//! Fault detection and alerting.
//!
//! - `anomalies`   — per-reading issue classification.
//! - `thresholds`  — physical-range limits the classifier checks against.
//! - `stalenesses` — freshness of the newest reading.
//! - `notify`      — push delivery of new issues.

pub mod anomalies;
pub mod notify;
pub mod stalenesses;
pub mod thresholds;
