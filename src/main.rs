//! Polling entry point.
//!
//! Set `SENSMON_DEV_FIXTURE` (or `--dev-fixture`) to replay a saved payload
//! instead of calling the API. See `Args` for the full command line.

mod args;

use std::path::Path;
use std::process::ExitCode;
use std::thread;

use chrono::Utc;
use clap::Parser as _;

use args::Args;
use sensmon_service::alert::anomalies::sort_newest_first;
use sensmon_service::alert::notify::Notifier;
use sensmon_service::config::{Config, load_config};
use sensmon_service::dev_mode::DevMode;
use sensmon_service::ingest::ReadingSource;
use sensmon_service::ingest::api::ApiClient;
use sensmon_service::logging::{self, Component};
use sensmon_service::monitor::{CycleSettings, Monitor};

fn main() -> ExitCode {
    // .env may carry the dev-mode variables clap reads.
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match read_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.log_level(),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    if let Some(fixture) = &args.dev_fixture {
        logging::info(
            Component::System,
            None,
            &format!(
                "Dev mode: replaying {} ({:+} days)",
                fixture.display(),
                args.dev_days_offset
            ),
        );
        let source = DevMode::new(fixture, args.dev_days_offset);
        return run(build_monitor(source, &config), &config, args.once);
    }

    let Some(token) = config.api.token.as_deref() else {
        eprintln!("SENSMON_API_TOKEN is not set");
        return ExitCode::FAILURE;
    };
    match ApiClient::new(&config.api.base_url, token, config.request_timeout()) {
        Ok(client) => {
            logging::info(Component::Api, None, &format!("Polling {}", client.url()));
            run(build_monitor(client, &config), &config, args.once)
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Config file if present, defaults otherwise; environment applies to both.
fn read_config(path: &Path) -> Result<Config, sensmon_service::config::ConfigError> {
    if path.exists() {
        return load_config(path);
    }
    let mut config = Config::default();
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn build_monitor<S: ReadingSource>(source: S, config: &Config) -> Monitor<S> {
    let monitor = Monitor::new(source, CycleSettings::from_config(config));
    let Some(notify) = &config.notify else {
        return monitor;
    };
    if notify.token.is_none() {
        logging::warn(
            Component::Notifier,
            None,
            "Notifications disabled: SENSMON_NOTIFY_TOKEN is not set",
        );
        return monitor;
    }
    match Notifier::new(&notify.endpoint, notify.token.clone(), config.request_timeout()) {
        Ok(notifier) => monitor.with_notifier(notifier),
        Err(e) => {
            logging::warn(Component::Notifier, None, &format!("Notifications disabled: {}", e));
            monitor
        }
    }
}

fn run<S: ReadingSource>(mut monitor: Monitor<S>, config: &Config, once: bool) -> ExitCode {
    loop {
        match monitor.tick_at(Utc::now()) {
            Ok(mut report) => {
                if once {
                    sort_newest_first(&mut report.issues);
                    return match serde_json::to_string_pretty(&report) {
                        Ok(json) => {
                            println!("{}", json);
                            ExitCode::SUCCESS
                        }
                        Err(e) => {
                            eprintln!("Cannot encode report: {}", e);
                            ExitCode::FAILURE
                        }
                    };
                }
                if let Some(latest) = &report.snapshot.latest {
                    logging::info(
                        Component::Metrics,
                        latest.sensor_id.as_deref(),
                        &format!(
                            "Latest {}: T={:?} RH={:?} DP={:?} VPD={:?}{}",
                            latest.updated_at.as_deref().unwrap_or("?"),
                            latest.temperature,
                            latest.humidity,
                            latest.dew_point,
                            latest.vpd,
                            if latest.stale { " (stale)" } else { "" }
                        ),
                    );
                }
            }
            // Already logged by the monitor; the next tick retries.
            Err(_) if !once => {}
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        }
        thread::sleep(config.poll_interval());
    }
}
