//! HTTP API routes and handlers.
//!
//! - `status` - The `GET /?mac=` reachability check
//! - `devices` - Overview of every monitored device
//! - `health` - Service health checks
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod devices;
pub mod health;
pub mod openapi;
pub mod status;

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /?mac=<address>        - Is the device in range?
/// /health                - Health check
/// /api
/// ├── /devices           - Status of every monitored device
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(status::check_device))
        .route("/health", get(health::health_check))
        .nest(
            "/api",
            Router::new()
                .route("/devices", get(devices::list_devices))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
