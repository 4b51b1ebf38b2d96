//! Decides whether a cached observation can still be reported as current.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::probe::ProbeOutcome;
use crate::store::DeviceRecord;

/// What can be said about a device right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No probe has completed for the device.
    Unknown,

    /// The last observation is older than the staleness threshold.
    Stale {
        /// Time since the observation.
        age: Duration,
    },

    /// The last observation is recent enough to report as-is.
    Current(ProbeOutcome),
}

impl Freshness {
    /// Response text and state flag for the status endpoint.
    ///
    /// A stale age is printed in whole seconds, truncated. Anything strictly
    /// past the threshold is stale, so an age of `threshold + 0.4s` reads as
    /// `Last checked is too old <threshold>`.
    #[must_use]
    pub fn describe(&self) -> (String, u8) {
        match self {
            Self::Unknown => ("Unknown MAC".to_string(), 0),
            Self::Stale { age } => (format!("Last checked is too old {}", age.as_secs()), 0),
            Self::Current(ProbeOutcome::Reachable) => ("in range".to_string(), 1),
            Self::Current(ProbeOutcome::Unreachable { .. } | ProbeOutcome::ProbeError { .. }) => {
                ("not found".to_string(), 0)
            }
        }
    }

    /// Stable lower-case label for API payloads.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stale { .. } => "stale",
            Self::Current(outcome) => outcome.label(),
        }
    }
}

/// Age of `record` at `now`, clamped at zero if the clock reads earlier than
/// the observation.
#[must_use]
pub fn age_at(record: &DeviceRecord, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(record.observed_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Apply the staleness threshold to an optional record.
///
/// An age exactly equal to `threshold` still counts as fresh.
#[must_use]
pub fn evaluate(
    record: Option<&DeviceRecord>,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Freshness {
    let Some(record) = record else {
        return Freshness::Unknown;
    };

    let age = age_at(record, now);
    if age > threshold {
        Freshness::Stale { age }
    } else {
        Freshness::Current(record.outcome)
    }
}
