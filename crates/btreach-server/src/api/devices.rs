//! Overview of every monitored device.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use btreach_core::freshness::{self, Freshness};
use btreach_core::{DeviceRecord, MacAddress};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Cached status of one monitored device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "address": "AA:BB:CC:DD:EE:FF",
    "status": "unreachable",
    "in_range": false,
    "diagnostic_code": 1,
    "observed_at_utc": "2025-01-15T03:30:00+00:00",
    "age_secs": 12
}))]
pub struct DeviceStatus {
    /// Hardware address.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,

    /// One of `reachable`, `unreachable`, `probe_error`, `stale`, `unknown`.
    #[schema(example = "reachable")]
    pub status: String,

    /// Whether the device is currently considered in range.
    pub in_range: bool,

    /// Diagnostic code of the last failed probe.
    pub diagnostic_code: Option<i32>,

    /// When the last probe completed (RFC 3339).
    pub observed_at_utc: Option<String>,

    /// Seconds since the last probe completed.
    pub age_secs: Option<u64>,
}

/// Status of all monitored devices.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DevicesResponse {
    /// Devices in scan order.
    pub devices: Vec<DeviceStatus>,

    /// Observations older than this are reported as stale.
    #[schema(example = 120)]
    pub stale_threshold_secs: u64,

    /// When this overview was produced.
    pub checked_at_utc: String,
}

/// List every monitored device with its cached status.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "status",
    operation_id = "listDevices",
    summary = "List monitored devices",
    description = "Returns every configured device in scan order with its cached \
        status after applying the staleness threshold.",
    responses(
        (status = 200, description = "Device overview", body = DevicesResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> Json<DevicesResponse> {
    let now = state.now();
    let threshold = state.stale_threshold();
    let records: HashMap<MacAddress, DeviceRecord> = state
        .store()
        .snapshot()
        .await
        .into_iter()
        .map(|record| (record.address, record))
        .collect();

    let devices = state
        .monitored()
        .iter()
        .map(|address| {
            let record = records.get(address);
            let freshness = freshness::evaluate(record, threshold, now);

            DeviceStatus {
                address: address.to_string(),
                status: freshness.label().to_string(),
                in_range: matches!(freshness, Freshness::Current(outcome) if outcome.is_reachable()),
                diagnostic_code: record.and_then(|r| r.outcome.diagnostic_code()),
                observed_at_utc: record.map(|r| r.observed_at.to_rfc3339()),
                age_secs: record.map(|r| freshness::age_at(r, now).as_secs()),
            }
        })
        .collect();

    Json(DevicesResponse {
        devices,
        stale_threshold_secs: threshold.as_secs(),
        checked_at_utc: now.to_rfc3339(),
    })
}
