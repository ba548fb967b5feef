//! OpenAPI specification for the vigil control API.

use axum::Json;
use utoipa::OpenApi;
use vigil_core::{DispatchStats, LastEvent, SourceStatus, StatusSnapshot};

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::inspector::InspectorResponse;
use super::lifecycle::LifecycleResponse;
use super::sources::SetSourceRequest;
use super::updates::{IntervalResponse, SetIntervalRequest, UpdatesResponse};

/// Serve the OpenAPI specification as JSON at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Main OpenAPI document structure for vigil.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vigil API",
        version = "0.1.0",
        description = r#"
# vigil API

vigil keeps a device's sensor and location sources subscribed and reports
every event to a development machine as `GET http://<host>:<port>/?<tag>&k=v`.

This local API controls that pipeline:

1. **Updates**: start and stop every source, change the motion sampling interval
2. **Sources**: see which sources exist, are authorized and are delivering; toggle them
3. **Lifecycle**: inject host lifecycle transitions
4. **Inspector**: counters, last event and effective configuration
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local vigil server")
    ),
    tags(
        (name = "system", description = "Health checks and diagnostics"),
        (name = "updates", description = "Start/stop and sampling interval"),
        (name = "sources", description = "Per-source state and toggles"),
        (name = "lifecycle", description = "Host lifecycle transitions")
    ),
    paths(
        super::health::health_check,
        super::status::get_status,
        super::updates::start_updates,
        super::updates::stop_updates,
        super::updates::get_interval,
        super::updates::set_interval,
        super::sources::list_sources,
        super::sources::set_source_enabled,
        super::lifecycle::post_lifecycle_event,
        super::inspector::get_inspector,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            StatusSnapshot,
            UpdatesResponse,
            SetIntervalRequest,
            IntervalResponse,
            SourceStatus,
            SetSourceRequest,
            LifecycleResponse,
            InspectorResponse,
            DispatchStats,
            LastEvent,
        )
    )
)]
pub struct ApiDoc;
