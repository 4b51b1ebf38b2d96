//! Device reachability endpoint.
//!
//! `GET /?mac=AA:BB:CC:DD:EE:FF` answers from the cache only; it never waits
//! on a probe.

use axum::extract::{Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::Json;
use btreach_core::{freshness, Freshness, MacAddress};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::state::SharedState;

/// Plain-text body returned when no address was given.
pub const MISSING_MAC_MESSAGE: &str = "Missing 'mac' parameter";

/// Reachability answer.
///
/// `state` is `1` only when the device answered its most recent probe and
/// that probe is recent enough to trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "description": "in range",
    "state": 1
}))]
pub struct StatusResponse {
    /// Human-readable result.
    #[schema(example = "in range")]
    pub description: String,

    /// `1` if in range, otherwise `0`.
    #[schema(example = 1)]
    pub state: u8,
}

impl StatusResponse {
    /// Response for an address that is not well-formed.
    #[must_use]
    pub fn wrong_input() -> Self {
        Self {
            description: "wrong input".to_string(),
            state: 0,
        }
    }
}

impl From<Freshness> for StatusResponse {
    fn from(freshness: Freshness) -> Self {
        let (description, state) = freshness.describe();
        Self { description, state }
    }
}

/// Decoded query parameters in request order.
///
/// Read as a pair list so that repeated keys cannot turn into an extractor
/// rejection.
fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default()
}

/// Check whether a device is in range.
///
/// The first `mac` parameter is used. A missing or empty parameter yields the
/// plain-text body `Missing 'mac' parameter` instead of JSON.
#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    operation_id = "checkDevice",
    summary = "Check whether a device is in range",
    description = "Answers from the most recent background probe of the device. \
        Observations older than the staleness threshold are reported as \
        'Last checked is too old <seconds>' instead of their cached result. \
        A missing 'mac' parameter returns the plain-text body \
        \"Missing 'mac' parameter\".",
    params(
        ("mac" = Option<String>, Query, description = "Hardware address, e.g. AA:BB:CC:DD:EE:FF")
    ),
    responses(
        (status = 200, description = "Reachability answer", body = StatusResponse)
    )
)]
pub async fn check_device(State(state): State<SharedState>, uri: Uri) -> Response {
    let Some(raw) = query_pairs(&uri)
        .into_iter()
        .find_map(|(key, value)| (key == "mac").then_some(value))
        .filter(|value| !value.is_empty())
    else {
        info!("Url param 'mac' is missing");
        return MISSING_MAC_MESSAGE.into_response();
    };

    let response: StatusResponse = match raw.parse::<MacAddress>() {
        Ok(address) => {
            let record = state.store().get(&address).await;
            freshness::evaluate(record.as_ref(), state.stale_threshold(), state.now()).into()
        }
        Err(_) => StatusResponse::wrong_input(),
    };

    info!(
        mac = %raw,
        description = %response.description,
        state = response.state,
        "Answered status request"
    );

    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use btreach_core::ProbeOutcome;
    use std::time::Duration;

    #[test]
    fn test_response_key_order() {
        let json = serde_json::to_string(&StatusResponse::wrong_input()).unwrap();
        assert_eq!(json, r#"{"description":"wrong input","state":0}"#);
    }

    #[test]
    fn test_query_pairs_keep_order_and_duplicates() {
        let uri: Uri = "/?mac=AA%3ABB%3ACC%3ADD%3AEE%3AFF&mac=x&other=1".parse().unwrap();
        assert_eq!(
            query_pairs(&uri),
            vec![
                ("mac".to_string(), "AA:BB:CC:DD:EE:FF".to_string()),
                ("mac".to_string(), "x".to_string()),
                ("other".to_string(), "1".to_string()),
            ]
        );

        let uri: Uri = "/".parse().unwrap();
        assert!(query_pairs(&uri).is_empty());
    }

    #[test]
    fn test_from_freshness() {
        assert_eq!(
            StatusResponse::from(Freshness::Current(ProbeOutcome::Reachable)),
            StatusResponse {
                description: "in range".to_string(),
                state: 1
            }
        );
        assert_eq!(
            StatusResponse::from(Freshness::Stale {
                age: Duration::from_secs(150)
            })
            .description,
            "Last checked is too old 150"
        );
    }
}
