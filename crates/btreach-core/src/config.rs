//! Application configuration management.
//!
//! Configuration is layered, later sources winning:
//! - built-in defaults
//! - a TOML file (`/etc/btreach/config.toml` on Linux)
//! - `BTREACH__SECTION__KEY` environment variables
//!
//! It is loaded once at startup and turned into an immutable
//! [`MonitorSettings`] by [`Config::validate`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::address::MacAddress;

/// Prefix for environment overrides, e.g. `BTREACH__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "BTREACH";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// Nothing to monitor.
    #[error("monitor.addresses: at least one device address is required")]
    NoAddresses,

    /// A single field holds an unusable value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several problems were found at once.
    #[error("{}", join_messages(.0))]
    MultipleValidationErrors(Vec<ConfigError>),
}

fn join_messages(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Complete configuration as read from its sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Which devices to watch and how often.
    pub monitor: MonitorConfig,
    /// External probe command.
    pub probe: ProbeConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

/// Monitored devices and cache policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Hardware addresses to probe, in scan order.
    pub addresses: Vec<String>,
    /// Pause between two scan cycles.
    pub scan_interval_secs: u64,
    /// Maximum age of an observation before it is reported as stale.
    pub stale_threshold_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            scan_interval_secs: 60,
            stale_threshold_secs: 120,
        }
    }
}

/// External probe command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path to `l2ping` or a compatible tool.
    pub command: PathBuf,
    /// Echo requests sent per probe.
    pub attempts: u32,
    /// Seconds to wait for each echo reply.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("/usr/bin/l2ping"),
            attempts: 2,
            timeout_secs: 1,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, coloured output for development.
    #[default]
    Pretty,
    /// Single-line output without colours, for journald.
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Stdout format.
    pub format: LogFormat,
    /// When set, JSON logs are also written to daily files here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// Validated, immutable settings the service runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Interface to bind.
    pub listen_host: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// Devices to probe, deduplicated, in configured order.
    pub addresses: Vec<MacAddress>,
    /// Pause between scan cycles.
    pub scan_interval: Duration,
    /// Echo requests per probe.
    pub ping_attempts: u32,
    /// Wait per echo request.
    pub ping_timeout: Duration,
    /// Maximum trusted age of an observation.
    pub stale_threshold: Duration,
    /// Probe executable.
    pub probe_command: PathBuf,
}

impl Config {
    /// Load configuration from defaults, a file, and the environment.
    ///
    /// With `path` set the file must exist; otherwise the platform default
    /// path is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or any source fails to parse.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(
            path,
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("monitor.addresses")
                .try_parsing(true),
        )
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> ConfigResult<Self> {
        let mut builder = ::config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default_path.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Platform default configuration file.
    ///
    /// On Linux (the Raspberry Pi target): `/etc/btreach/config.toml`.
    /// Elsewhere: the user config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Some(PathBuf::from("/etc/btreach/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "btreach")
                .map(|dirs| dirs.config_dir().join("config.toml"))
        }
    }

    /// Check every field and build the runtime settings.
    ///
    /// All problems are collected before returning. Addresses that repeat
    /// (ignoring case) are dropped after their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MultipleValidationErrors`] when more than one
    /// problem is found, otherwise the single error.
    pub fn validate(&self) -> ConfigResult<MonitorSettings> {
        let mut errors = Vec::new();

        if self.monitor.addresses.is_empty() {
            errors.push(ConfigError::NoAddresses);
        }

        let mut addresses: Vec<MacAddress> = Vec::with_capacity(self.monitor.addresses.len());
        for (index, raw) in self.monitor.addresses.iter().enumerate() {
            match raw.trim().parse::<MacAddress>() {
                Ok(address) if addresses.contains(&address) => {
                    warn!(%address, index, "Ignoring duplicate monitored address");
                }
                Ok(address) => addresses.push(address),
                Err(_) => errors.push(ConfigError::ValidationError {
                    field: format!("monitor.addresses[{index}]"),
                    message: format!("'{raw}' is not a hardware address (expected AA:BB:CC:DD:EE:FF)"),
                }),
            }
        }

        for (field, value) in [
            ("monitor.scan_interval_secs", self.monitor.scan_interval_secs),
            ("monitor.stale_threshold_secs", self.monitor.stale_threshold_secs),
            ("probe.timeout_secs", self.probe.timeout_secs),
            ("probe.attempts", u64::from(self.probe.attempts)),
        ] {
            if value == 0 {
                errors.push(ConfigError::ValidationError {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.probe.command.as_os_str().is_empty() {
            errors.push(ConfigError::ValidationError {
                field: "probe.command".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if errors.len() > 1 {
            return Err(ConfigError::MultipleValidationErrors(errors));
        }
        if let Some(error) = errors.pop() {
            return Err(error);
        }

        Ok(MonitorSettings {
            listen_host: self.server.host.clone(),
            listen_port: self.server.port,
            addresses,
            scan_interval: Duration::from_secs(self.monitor.scan_interval_secs),
            ping_attempts: self.probe.attempts,
            ping_timeout: Duration::from_secs(self.probe.timeout_secs),
            stale_threshold: Duration::from_secs(self.monitor.stale_threshold_secs),
            probe_command: self.probe.command.clone(),
        })
    }
}
