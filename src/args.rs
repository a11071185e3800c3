use std::path::PathBuf;

use clap::Parser;

/// Dev-mode offsets beyond a century are rejected at parse time.
const MAX_DAYS_OFFSET: i64 = 366 * 100;

/// Sensor dashboard and fault monitor.
///
/// Without `--once` the service fetches, derives and classifies on every
/// polling interval until killed. With `--once` it runs a single cycle and
/// prints the report as JSON.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// TOML config; defaults plus environment are used if it does not exist.
    #[arg(default_value = "sensmon.toml")]
    pub config: PathBuf,

    /// Run one cycle, print the report and exit.
    #[arg(long)]
    pub once: bool,

    /// Replay this saved sensor-data payload instead of calling the API.
    #[arg(long, env = "SENSMON_DEV_FIXTURE")]
    pub dev_fixture: Option<PathBuf>,

    /// Shift replayed timestamps forward by this many days.
    #[arg(
        long,
        env = "SENSMON_DEV_DAYS_OFFSET",
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-MAX_DAYS_OFFSET..=MAX_DAYS_OFFSET)
    )]
    pub dev_days_offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sensmon_service"]).expect("no arguments is valid");
        assert_eq!(args.config, PathBuf::from("sensmon.toml"));
        assert!(!args.once);
    }

    #[test]
    fn test_config_path_and_once() {
        let args = Args::try_parse_from(["sensmon_service", "/etc/sensmon.toml", "--once"])
            .expect("should parse");
        assert_eq!(args.config, PathBuf::from("/etc/sensmon.toml"));
        assert!(args.once);
    }

    #[test]
    fn test_dev_flags() {
        let args = Args::try_parse_from([
            "sensmon_service",
            "--dev-fixture",
            "tests/fixtures/sensor_data.json",
            "--dev-days-offset",
            "-3",
        ])
        .expect("should parse");
        assert_eq!(
            args.dev_fixture,
            Some(PathBuf::from("tests/fixtures/sensor_data.json"))
        );
        assert_eq!(args.dev_days_offset, -3);
    }

    #[test]
    fn test_bad_days_offset_is_rejected() {
        for bad in ["abc", "1.5", "99999999999"] {
            let result = Args::try_parse_from(["sensmon_service", "--dev-days-offset", bad]);
            assert!(result.is_err(), "{} should be rejected", bad);
        }
    }
}
