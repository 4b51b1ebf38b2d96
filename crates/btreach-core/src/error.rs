//! Unified error types for the btreach core library.
//!
//! [`ReachError`] covers the failures that can stop the service from
//! starting. Probe failures are deliberately absent: they are recorded in the
//! store as [`ProbeOutcome::ProbeError`](crate::probe::ProbeOutcome::ProbeError)
//! and never surface as an `Err`.
//!
//! # Example
//!
//! ```rust
//! use btreach_core::error::{ReachError, Result};
//! use btreach_core::MacAddress;
//!
//! fn parse(input: &str) -> Result<MacAddress> {
//!     input.parse()
//! }
//!
//! assert!(matches!(parse("not-a-mac"), Err(ReachError::InvalidAddress(_))));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for btreach operations.
#[derive(Debug, Error)]
pub enum ReachError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration sources could not be read or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    /// The scanner was asked to start with nothing to monitor.
    #[error("No device addresses configured. Add at least one address under [monitor].addresses.")]
    NoAddressesConfigured,

    // =========================================================================
    // ADDRESS ERRORS
    // =========================================================================
    /// A string is not a hardware address of the form `AA:BB:CC:DD:EE:FF`.
    #[error("Invalid hardware address: '{0}'. Expected six colon-separated hex pairs.")]
    InvalidAddress(String),
}

/// A specialized [`Result`] type for btreach operations.
pub type Result<T> = std::result::Result<T, ReachError>;

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for ReachError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::NoAddresses => Self::NoAddressesConfigured,
            err @ (ConfigError::ValidationError { .. }
            | ConfigError::MultipleValidationErrors(_)) => {
                Self::ConfigValidationError(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_from_config_error() {
        let err: ReachError = ConfigError::NoAddresses.into();
        assert!(matches!(err, ReachError::NoAddressesConfigured));

        let err: ReachError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "monitor.addresses[0]".into(),
                message: "not a hardware address".into(),
            },
            ConfigError::ValidationError {
                field: "probe.attempts".into(),
                message: "must be at least 1".into(),
            },
        ])
        .into();
        let text = err.to_string();
        assert!(text.contains("monitor.addresses[0]"));
        assert!(text.contains("probe.attempts"));
        assert!(text.contains("; "));
    }

    #[test]
    fn test_error_display_messages() {
        let err = ReachError::InvalidAddress("not-a-mac".into());
        assert!(err.to_string().contains("not-a-mac"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ReachError>();
        assert_sync::<ReachError>();
    }
}
