//! # btreach-server
//!
//! HTTP server reporting whether configured Bluetooth devices are in range.
//!
//! This binary:
//! - loads and validates configuration (fatal on any invalid address)
//! - runs the background scanner that pings every device with `l2ping`
//! - serves `GET /?mac=` answers from the scanner's cache
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package btreach-server -- --config ./config.toml
//!
//! # Production (on Raspberry Pi)
//! ./btreach-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use btreach_core::{
    Config, DeviceStore, L2PingProber, LogFormat, MonitorSettings, ReachError, Scanner,
};
use btreach_server::{api, logging, state::AppState};
use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cached Bluetooth reachability over HTTP.
#[derive(Debug, Parser)]
#[command(name = "btreach-server", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults to /etc/btreach/config.toml if present.
    #[arg(short, long, env = "BTREACH_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Stdout log format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.into();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())
        .map_err(ReachError::from)
        .context("Failed to load configuration")?;
    cli.apply(&mut config);

    logging::init(&config.logging)?;

    let settings = validated_settings(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        devices = settings.addresses.len(),
        "Starting btreach-server"
    );

    serve(settings).await
}

/// Validate `config` into runtime settings.
fn validated_settings(config: &Config) -> anyhow::Result<MonitorSettings> {
    config
        .validate()
        .map_err(ReachError::from)
        .context("Invalid configuration")
}

/// Bind the listener, start the scanner and serve until a shutdown signal.
async fn serve(settings: MonitorSettings) -> anyhow::Result<()> {
    let addr = format!("{}:{}", settings.listen_host, settings.listen_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Can not listen on {addr}"))?;

    let (store, writer) = DeviceStore::new_with_writer();
    let prober = L2PingProber::from_settings(&settings);
    let scanner = Scanner::new(
        settings.addresses.clone(),
        prober,
        writer,
        settings.scan_interval,
    )?;

    let state = AppState::new(
        store,
        settings.addresses.clone(),
        settings.stale_threshold,
        scanner.subscribe(),
    );

    let cancel = CancellationToken::new();
    let scanner_task = tokio::spawn(scanner.run(cancel.clone()));

    let app = api::create_router(state);
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // The listener may also stop on its own; make sure the scanner follows.
    cancel.cancel();
    scanner_task.await.context("Scanner task panicked")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["btreach-server", "--port", "9000", "--log-format", "json"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_config_reports_cause() {
        let err = validated_settings(&Config::default()).unwrap_err();
        let report = format!("{err:#}");
        assert!(report.starts_with("Invalid configuration: "));
        assert!(report.contains("No device addresses configured"));

        let mut config = Config::default();
        config.monitor.addresses = vec!["aa:bb:cc:dd:ee:ff".to_string()];
        let settings = validated_settings(&config).unwrap();
        assert_eq!(settings.addresses.len(), 1);
    }
}
