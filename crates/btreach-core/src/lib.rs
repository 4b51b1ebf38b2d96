//! # btreach-core
//!
//! Core logic for btreach: answering "is this Bluetooth device in range?"
//! from a cache that a background scanner keeps up to date.
//!
//! ## Architecture
//!
//! - [`address`] - Hardware address validation and the [`MacAddress`] type
//! - [`probe`] - The [`Prober`] seam and the `l2ping`-backed implementation
//! - [`store`] - Single-writer, many-reader cache of the latest observation per device
//! - [`scanner`] - The periodic, cancellable scan loop that owns the store writer
//! - [`freshness`] - Decides whether a cached observation may be reported as current
//! - [`config`] - Layered configuration loading and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod address;
pub mod config;
pub mod error;
pub mod freshness;
pub mod probe;
pub mod scanner;
pub mod store;

// Re-export primary types for convenience
pub use address::{is_valid_mac_address, MacAddress};
pub use self::config::{
    Config, ConfigError, ConfigResult, LogFormat, LoggingConfig, MonitorConfig, MonitorSettings,
    ProbeConfig, ServerConfig,
};
pub use error::{ReachError, Result};
pub use freshness::{evaluate, Freshness};
pub use probe::{classify_exit, L2PingProber, ProbeOutcome, Prober, PROBE_ERROR_CODE};
pub use scanner::{CycleReport, Scanner, ScannerState};
pub use store::{DeviceRecord, DeviceStore, StoreWriter};
