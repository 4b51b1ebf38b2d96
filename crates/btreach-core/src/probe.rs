//! Reachability probing.
//!
//! A probe is one invocation of an external round-trip check against a single
//! device. The [`Prober`] trait is the seam the scanner depends on; the
//! production implementation is [`L2PingProber`], which shells out to BlueZ's
//! `l2ping`.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::address::MacAddress;
use crate::config::MonitorSettings;

/// Diagnostic code recorded when the probe mechanism could not run at all.
///
/// Process exit codes are always in `0..=255`, so this never collides with a
/// real result.
pub const PROBE_ERROR_CODE: i32 = -1;

/// Extra time allowed on top of `attempts × timeout` before the child is killed.
const INVOCATION_GRACE: Duration = Duration::from_secs(2);

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The device answered.
    Reachable,

    /// The check ran and reported failure.
    Unreachable {
        /// Exit status of the external check.
        code: i32,
    },

    /// The check could not be run or its result could not be read.
    ProbeError {
        /// [`PROBE_ERROR_CODE`] for every failure currently detected.
        code: i32,
    },
}

impl ProbeOutcome {
    /// Returns `true` only for [`ProbeOutcome::Reachable`].
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    /// The diagnostic code carried by a failed outcome.
    #[must_use]
    pub const fn diagnostic_code(&self) -> Option<i32> {
        match self {
            Self::Reachable => None,
            Self::Unreachable { code } | Self::ProbeError { code } => Some(*code),
        }
    }

    /// Stable lower-case label for logs and API payloads.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable { .. } => "unreachable",
            Self::ProbeError { .. } => "probe_error",
        }
    }
}

/// Maps the exit code of the external check to an outcome.
///
/// `None` means the process ended without a code (killed by a signal).
#[must_use]
pub const fn classify_exit(code: Option<i32>) -> ProbeOutcome {
    match code {
        Some(0) => ProbeOutcome::Reachable,
        Some(code) => ProbeOutcome::Unreachable { code },
        None => ProbeOutcome::ProbeError {
            code: PROBE_ERROR_CODE,
        },
    }
}

/// Something that can check whether a device is reachable.
///
/// Implementations must never fail: every problem is expressed as a
/// [`ProbeOutcome`].
pub trait Prober: Send + Sync {
    /// Probe `address` once. May take up to the implementation's own deadline.
    fn probe(&self, address: MacAddress) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probes devices with `l2ping -t <timeout> -c <attempts> <address>`.
#[derive(Debug, Clone)]
pub struct L2PingProber {
    command: PathBuf,
    attempts: u32,
    timeout: Duration,
}

impl L2PingProber {
    /// Create a prober running `command` with the given attempt count and
    /// per-attempt timeout.
    pub fn new(command: impl Into<PathBuf>, attempts: u32, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            attempts: attempts.max(1),
            timeout,
        }
    }

    /// Create a prober from validated settings.
    #[must_use]
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self::new(
            settings.probe_command.clone(),
            settings.ping_attempts,
            settings.ping_timeout,
        )
    }

    /// Upper bound on a single invocation.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.timeout
            .saturating_mul(self.attempts)
            .saturating_add(INVOCATION_GRACE)
    }

    async fn invoke(&self, address: MacAddress) -> ProbeOutcome {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-t")
            .arg(self.timeout.as_secs().max(1).to_string())
            .arg("-c")
            .arg(self.attempts.to_string())
            .arg(address.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.deadline(), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(
                    %address,
                    command = %self.command.display(),
                    error = %e,
                    "Failed to invoke probe command"
                );
                return ProbeOutcome::ProbeError {
                    code: PROBE_ERROR_CODE,
                };
            }
            Err(_) => {
                warn!(
                    %address,
                    deadline_ms = u64::try_from(self.deadline().as_millis()).unwrap_or(u64::MAX),
                    "Probe command overran its deadline and was killed"
                );
                return ProbeOutcome::ProbeError {
                    code: PROBE_ERROR_CODE,
                };
            }
        };

        let exit_code = output.status.code();
        debug!(
            %address,
            exit_code = ?exit_code,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Probe command finished"
        );

        classify_exit(exit_code)
    }
}

impl Prober for L2PingProber {
    fn probe(&self, address: MacAddress) -> impl Future<Output = ProbeOutcome> + Send {
        self.invoke(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> MacAddress {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    #[test]
    fn test_classify_exit() {
        assert_eq!(classify_exit(Some(0)), ProbeOutcome::Reachable);
        assert_eq!(
            classify_exit(Some(1)),
            ProbeOutcome::Unreachable { code: 1 }
        );
        assert_eq!(
            classify_exit(None),
            ProbeOutcome::ProbeError {
                code: PROBE_ERROR_CODE
            }
        );
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(ProbeOutcome::Reachable.is_reachable());
        assert_eq!(ProbeOutcome::Reachable.diagnostic_code(), None);
        assert_eq!(
            ProbeOutcome::Unreachable { code: 1 }.diagnostic_code(),
            Some(1)
        );
        assert_eq!(ProbeOutcome::ProbeError { code: -1 }.label(), "probe_error");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&ProbeOutcome::Unreachable { code: 1 }).unwrap();
        assert_eq!(json, r#"{"kind":"unreachable","code":1}"#);
    }

    #[test]
    fn test_deadline_covers_all_attempts() {
        let prober = L2PingProber::new("l2ping", 3, Duration::from_secs(2));
        assert_eq!(prober.deadline(), Duration::from_secs(8));

        let prober = L2PingProber::new("l2ping", 0, Duration::from_secs(1));
        assert_eq!(prober.deadline(), Duration::from_secs(3));
    }

    #[test]
    fn test_deadline_saturates_on_huge_timeout() {
        let prober = L2PingProber::new("l2ping", 2, Duration::from_secs(u64::MAX));
        assert_eq!(prober.deadline(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_missing_command_is_probe_error() {
        let prober = L2PingProber::new(
            "/nonexistent/btreach/l2ping",
            1,
            Duration::from_secs(1),
        );
        assert_eq!(
            prober.probe(addr()).await,
            ProbeOutcome::ProbeError {
                code: PROBE_ERROR_CODE
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command_is_reachable() {
        let prober = L2PingProber::new("true", 2, Duration::from_secs(1));
        assert_eq!(prober.probe(addr()).await, ProbeOutcome::Reachable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_keeps_exit_code() {
        let prober = L2PingProber::new("false", 2, Duration::from_secs(1));
        assert_eq!(
            prober.probe(addr()).await,
            ProbeOutcome::Unreachable { code: 1 }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overrunning_command_is_killed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = L2PingProber::new(&script, 1, Duration::from_secs(1));
        let started = std::time::Instant::now();
        let outcome = prober.probe(addr()).await;
        let elapsed = started.elapsed();

        assert_eq!(
            outcome,
            ProbeOutcome::ProbeError {
                code: PROBE_ERROR_CODE
            }
        );
        assert!(elapsed >= Duration::from_millis(2900), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "returned after {elapsed:?}");
    }
}
