//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "EVQ_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDERR_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for the console layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Where log records are written besides the rolling file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// Only the rolling file. Used while a terminal UI owns the screen.
    FileOnly,
    /// Rolling file plus stderr in the configured [`LogFormat`].
    FileAndStderr,
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `EVQ_LOG` overrides the filter (e.g. `info`, `evq_core=debug`). When unset the
///   standard `RUST_LOG` variable is honoured, finally defaulting to `info`.
/// * A daily rolling JSON file is always written to `config.directory`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig, sink: LogSink) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let file_appender = daily(
        &config.directory,
        format!("{}-{}.log", prefix, service_name),
    );
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = FILE_GUARD.set(file_guard);

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let console_layer = match sink {
        LogSink::FileOnly => None,
        LogSink::FileAndStderr => {
            let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
            let _ = STDERR_GUARD.set(stderr_guard);
            Some(match config.format {
                LogFormat::StructuredJson => fmt::layer()
                    .with_target(false)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(stderr_writer)
                    .boxed(),
                LogFormat::Pretty => fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(stderr_writer)
                    .boxed(),
            })
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .ok();

    info!(service = %service_name, log_dir = %config.directory.display(), format = ?config.format, sink = ?sink, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_uses_kebab_case() {
        let parsed: LoggingConfig = toml::from_str("format = \"pretty\"").unwrap();
        assert_eq!(parsed.format, LogFormat::Pretty);
        let parsed: LoggingConfig = toml::from_str("format = \"structured-json\"").unwrap();
        assert_eq!(parsed.format, LogFormat::StructuredJson);
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            ..LoggingConfig::default()
        };
        init_tracing("evq-test", &config, LogSink::FileOnly).unwrap();
        assert!(config.directory.is_dir());
    }
}
