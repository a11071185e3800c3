//! Sensor monitoring service.
//!
//! Turns batches of raw temperature/humidity/CO2/EC/pH readings from the
//! device backend into dashboard values (dew point, VPD, chart series) and a
//! flat history of classified faults.
//!
//! - `model`    — shared types and errors.
//! - `analysis` — derived metrics, window selection, dashboard and hourly views.
//! - `alert`    — fault classification, thresholds, staleness, notifications.
//! - `ingest`   — sensor-data API client and the `ReadingSource` seam.
//! - `monitor`  — one fetch/derive/classify cycle, driven by the caller.
//! - `config`, `logging`, `dev_mode` — service plumbing.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
