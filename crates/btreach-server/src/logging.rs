//! Logging initialization and configuration.
//!
//! Stdout output follows [`LogFormat`]:
//! - **pretty**: multi-line with span events, for development
//! - **compact**: single line without ANSI colours, for journald
//! - **json**: one object per line
//!
//! When a log directory is configured, JSON logs are additionally written to
//! daily rolling files there.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use btreach_core::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_subscriber::{Layer, Registry};

/// Static guards to keep non-blocking writers alive.
/// These must persist for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Overrides `logging.level` when `RUST_LOG` is not set.
const LOG_LEVEL_ENV: &str = "BTREACH_LOG_LEVEL";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the global subscriber.
///
/// Filter precedence: `RUST_LOG`, then `BTREACH_LOG_LEVEL`, then
/// `logging.level`.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed, the log directory cannot
/// be created, or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| config.level.clone());
    let env_filter = build_filter(&level)?;

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(config.format)];
    if let Some(dir) = log_directory(config) {
        layers.push(file_layer(&dir)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?)
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    if format == LogFormat::Pretty {
        return tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .boxed();
    }

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = STDOUT_GUARD.set(guard);

    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .boxed(),
        LogFormat::Compact | LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed(),
    }
}

fn file_layer(dir: &Path) -> anyhow::Result<BoxedLayer> {
    std::fs::create_dir_all(dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "btreach");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = FILE_GUARD.set(guard);

    Ok(tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .boxed())
}

/// The configured log directory, ignoring an empty value.
fn log_directory(config: &LoggingConfig) -> Option<PathBuf> {
    config
        .directory
        .as_ref()
        .filter(|dir| !dir.as_os_str().is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_directory_is_ignored() {
        let mut config = LoggingConfig::default();
        assert!(log_directory(&config).is_none());

        config.directory = Some(PathBuf::new());
        assert!(log_directory(&config).is_none());

        config.directory = Some(PathBuf::from("/var/log/btreach"));
        assert_eq!(
            log_directory(&config),
            Some(PathBuf::from("/var/log/btreach"))
        );
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("btreach=loud").is_err());
        }
        assert!(build_filter("debug").is_ok());
    }
}
