//! OpenAPI specification generation for the btreach API.

use axum::Json;
use utoipa::OpenApi;

use super::devices::{DeviceStatus, DevicesResponse};
use super::health::HealthResponse;
use super::status::StatusResponse;

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
pub fn get_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .expect("Failed to serialize OpenAPI spec")
}

/// Main OpenAPI document structure for btreach.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "btreach API",
        version = "0.1.0",
        description = r#"
# btreach API

btreach reports whether configured Bluetooth devices are within range.

A background scanner pings every configured device with `l2ping` on a fixed
interval and caches the result. Requests are answered from that cache and
never wait for a ping. Results older than the staleness threshold are reported
as too old rather than as the last known state.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local btreach server")
    ),
    tags(
        (name = "status", description = "Cached device reachability"),
        (name = "system", description = "Health checks and system status")
    ),
    paths(
        super::status::check_device,
        super::devices::list_devices,
        super::health::health_check,
    ),
    components(
        schemas(
            StatusResponse,
            DeviceStatus,
            DevicesResponse,
            HealthResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "btreach API");
        assert!(spec.paths.paths.contains_key("/"));
        assert!(spec.paths.paths.contains_key("/api/devices"));
        assert!(spec.paths.paths.contains_key("/health"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"btreach API\""));
    }
}
