//! Derived metrics and data organization for the sensor dashboard.
//!
//! Everything here is pure computation over a batch of readings; fetching
//! and scheduling live in `ingest` and `monitor`.
//!
//! Submodules:
//! - `metrics`   — dew point and VPD per reading.
//! - `window`    — newest-first selection inside the lookback window.
//! - `dashboard` — headline values and chart series built from a selection.
//! - `hourly`    — per-hour averages for the statistics view.

pub mod dashboard;
pub mod hourly;
pub mod metrics;
pub mod window;
