//! Tracing setup
//!
//! Text mode writes to the log file and to stdout; JSON mode writes flat
//! JSON lines to the log file only. `RUST_LOG` takes precedence over the
//! configured level.

use crate::config::AppConfig;
use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Dependencies that are chatty at info level
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "reqwest=warn"];

/// Map a configured rotation name to the appender policy
pub fn rotation_from_name(name: &str) -> Option<Rotation> {
    match name {
        "minutely" => Some(Rotation::MINUTELY),
        "hourly" => Some(Rotation::HOURLY),
        "daily" => Some(Rotation::DAILY),
        "never" => Some(Rotation::NEVER),
        _ => None,
    }
}

fn default_filter(log_level: &str) -> String {
    std::iter::once(log_level)
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn file_appender(config: &AppConfig) -> anyhow::Result<RollingFileAppender> {
    let rotation = rotation_from_name(&config.rotation)
        .with_context(|| format!("Unknown log rotation: {}", config.rotation))?;

    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.log_file.clone())
        .build(&config.log_dir)
        .with_context(|| format!("Failed to open log directory: {}", config.log_dir))
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_logging(config: &AppConfig) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let json_file = config.use_json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_writer(writer.clone())
    });
    let text_file = (!config.use_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer.clone())
    });
    let stdout = (!config.use_json).then(|| fmt::layer().with_target(false).with_ansi(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_file)
        .with(text_file)
        .with(stdout)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(rotation: &str, log_dir: &str) -> AppConfig {
        let mut config = AppConfig::from_yaml_str(
            "log_level: info\nlog_dir: ./logs\nlog_file: test.log\nuse_json: false\nrotation: daily\n",
        )
        .unwrap();
        config.rotation = rotation.to_string();
        config.log_dir = log_dir.to_string();
        config
    }

    #[test]
    fn test_default_filter_quiets_dependencies() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation_from_name("hourly"), Some(Rotation::HOURLY));
        assert_eq!(rotation_from_name("daily"), Some(Rotation::DAILY));
        assert_eq!(rotation_from_name("never"), Some(Rotation::NEVER));
        assert_eq!(rotation_from_name("weekly"), None);
        assert_eq!(rotation_from_name("Daily"), None);
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = std::env::temp_dir().join(format!(
            "loyalty_ledger_logs_{}",
            std::process::id()
        ));
        let config = config_with("never", dir.to_str().unwrap());

        assert!(file_appender(&config).is_ok());
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_appender_rejects_unknown_rotation() {
        let config = config_with("weekly", "./logs");
        let err = file_appender(&config).unwrap_err();
        assert!(err.to_string().contains("weekly"));
    }
}
