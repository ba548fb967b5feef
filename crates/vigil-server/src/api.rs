//! HTTP control API.
//!
//! - `health` - Service health checks
//! - `status` - Status labels
//! - `updates` - Start/stop and sampling interval
//! - `sources` - Per-source state and toggles
//! - `lifecycle` - Lifecycle transitions
//! - `inspector` - Diagnostic snapshot
//! - `error` - API error types
//! - `openapi` - OpenAPI specification

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub mod error;
pub mod health;
pub mod inspector;
pub mod lifecycle;
pub mod openapi;
pub mod sources;
pub mod status;
pub mod updates;

pub use error::{ApiError, ApiResult, ErrorResponse};

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                    - Health check
/// /api
/// ├── /status                - Status labels
/// ├── /updates/start|stop    - Start or stop all sources
/// ├── /interval              - Motion sampling interval
/// ├── /sources[/{source}]    - Source state and toggles
/// ├── /lifecycle/{event}     - Lifecycle transitions
/// ├── /inspector             - Diagnostic snapshot
/// └── /openapi.json          - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/status", get(status::get_status))
                .route(
                    "/interval",
                    get(updates::get_interval).put(updates::set_interval),
                )
                .route("/lifecycle/{event}", post(lifecycle::post_lifecycle_event))
                .route("/inspector", get(inspector::get_inspector))
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/updates", updates::router())
                .nest("/sources", sources::router()),
        )
        .with_state(state)
}
