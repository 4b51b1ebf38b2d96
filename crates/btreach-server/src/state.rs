//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use btreach_core::{DeviceStore, MacAddress, ScannerState};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Alias used by handlers, matching the router's state type.
pub type SharedState = AppState;

/// Source of the current time used to age cached observations.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct AppStateInner {
    store: DeviceStore,
    monitored: Vec<MacAddress>,
    stale_threshold: Duration,
    scanner_state: watch::Receiver<ScannerState>,
    clock: Clock,
}

impl AppState {
    /// Create new application state around a store read handle.
    #[must_use]
    pub fn new(
        store: DeviceStore,
        monitored: Vec<MacAddress>,
        stale_threshold: Duration,
        scanner_state: watch::Receiver<ScannerState>,
    ) -> Self {
        Self::with_clock(
            store,
            monitored,
            stale_threshold,
            scanner_state,
            Arc::new(Utc::now),
        )
    }

    /// Like [`AppState::new`], but ages observations against `clock`.
    #[must_use]
    pub fn with_clock(
        store: DeviceStore,
        monitored: Vec<MacAddress>,
        stale_threshold: Duration,
        scanner_state: watch::Receiver<ScannerState>,
        clock: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                monitored,
                stale_threshold,
                scanner_state,
                clock,
            }),
        }
    }

    /// Read handle to the device cache.
    #[must_use]
    pub fn store(&self) -> &DeviceStore {
        &self.inner.store
    }

    /// Configured addresses in scan order.
    #[must_use]
    pub fn monitored(&self) -> &[MacAddress] {
        &self.inner.monitored
    }

    /// Maximum age of an observation that may be reported as current.
    #[must_use]
    pub fn stale_threshold(&self) -> Duration {
        self.inner.stale_threshold
    }

    /// Current time according to the state's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }

    /// Current state of the background scanner.
    #[must_use]
    pub fn scanner_state(&self) -> ScannerState {
        *self.inner.scanner_state.borrow()
    }
}
