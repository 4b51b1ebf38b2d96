//! Background scan loop.
//!
//! The scanner owns the store's only [`StoreWriter`]. It probes every
//! configured address in order, writes each result as soon as it arrives, then
//! sleeps for the scan interval and starts over until cancelled.
//!
//! Cancellation is honoured between probes and during the sleep. A probe that
//! has already started always runs to completion and is written first.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::MacAddress;
use crate::error::{ReachError, Result};
use crate::probe::{ProbeOutcome, Prober};
use crate::store::StoreWriter;

/// Lifecycle of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerState {
    /// Waiting for the next cycle.
    Idle,
    /// Probing devices.
    Scanning,
    /// The loop has exited.
    Stopped,
}

impl ScannerState {
    /// Lower-case name used in logs and API payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Stopped => "stopped",
        }
    }
}

/// Summary of one pass over the configured addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Probes completed and written.
    pub probed: usize,
    /// Devices that answered.
    pub reachable: usize,
    /// Devices that did not answer.
    pub unreachable: usize,
    /// Probes that could not run.
    pub errors: usize,
    /// Whether cancellation cut the cycle short.
    pub interrupted: bool,
    /// Wall time spent in the cycle.
    pub elapsed: Duration,
}

impl CycleReport {
    fn record(&mut self, outcome: ProbeOutcome) {
        self.probed += 1;
        match outcome {
            ProbeOutcome::Reachable => self.reachable += 1,
            ProbeOutcome::Unreachable { .. } => self.unreachable += 1,
            ProbeOutcome::ProbeError { .. } => self.errors += 1,
        }
    }
}

/// Periodically probes a fixed list of devices into the store.
pub struct Scanner<P> {
    addresses: Vec<MacAddress>,
    prober: P,
    writer: StoreWriter,
    interval: Duration,
    state: watch::Sender<ScannerState>,
}

impl<P: Prober> Scanner<P> {
    /// Create a scanner over `addresses`, probed in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ReachError::NoAddressesConfigured`] if `addresses` is empty.
    pub fn new(
        addresses: Vec<MacAddress>,
        prober: P,
        writer: StoreWriter,
        interval: Duration,
    ) -> Result<Self> {
        if addresses.is_empty() {
            return Err(ReachError::NoAddressesConfigured);
        }

        let (state, _) = watch::channel(ScannerState::Idle);
        Ok(Self {
            addresses,
            prober,
            writer,
            interval,
            state,
        })
    }

    /// Watch the scanner's lifecycle state.
    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.subscribe()
    }

    /// Probe every address once, stopping early if `cancel` fires between
    /// probes.
    pub async fn scan_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        self.state.send_replace(ScannerState::Scanning);
        let started = Instant::now();
        let mut report = CycleReport::default();

        for &address in &self.addresses {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let outcome = self.prober.probe(address).await;
            let record = self.writer.put(address, outcome).await;
            report.record(outcome);

            match outcome {
                ProbeOutcome::ProbeError { code } => {
                    warn!(%address, code, "Probe could not be run; recorded as probe error");
                }
                _ => debug!(
                    %address,
                    outcome = outcome.label(),
                    code = ?outcome.diagnostic_code(),
                    observed_at = %record.observed_at,
                    "Recorded probe result"
                ),
            }
        }

        report.elapsed = started.elapsed();
        self.state.send_replace(ScannerState::Idle);
        report
    }

    /// Run until `cancel` fires.
    ///
    /// The first cycle starts immediately; later cycles start `interval` after
    /// the previous one finished.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            devices = self.addresses.len(),
            interval_secs = self.interval.as_secs(),
            "Scanner started"
        );

        loop {
            let report = self.scan_cycle(&cancel).await;
            info!(
                probed = report.probed,
                reachable = report.reachable,
                unreachable = report.unreachable,
                errors = report.errors,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                interrupted = report.interrupted,
                "Scan cycle finished"
            );

            if report.interrupted {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state.send_replace(ScannerState::Stopped);
        info!("Scanner stopped");
    }
}
