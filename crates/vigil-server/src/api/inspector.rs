//! Diagnostic snapshot of the whole pipeline.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use vigil_core::{DispatchStats, LastEvent, SourceStatus};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Everything needed to tell why an event did or did not arrive.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectorResponse {
    /// Whether sources are started.
    pub running: bool,

    /// Current motion sampling interval in seconds.
    #[schema(example = 10.0)]
    pub interval_secs: f64,

    /// Whether outbound pings are sent.
    pub notifications_enabled: bool,

    /// Base URL pings are sent to.
    #[schema(example = "http://192.168.1.123:8000/")]
    pub endpoint: String,

    /// Seconds since the server started.
    pub uptime_secs: u64,

    /// Every registered source.
    pub sources: Vec<SourceStatus>,

    /// Dispatcher counters.
    pub stats: DispatchStats,

    /// Most recent event, if any.
    #[schema(nullable)]
    pub last_event: Option<LastEvent>,

    /// Effective configuration.
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
}

/// Get the diagnostic snapshot.
#[utoipa::path(
    get,
    path = "/api/inspector",
    tag = "system",
    operation_id = "getInspector",
    summary = "Inspect the pipeline",
    description = "Returns the registry snapshot, dispatcher counters, the last event and \
        the effective configuration.",
    responses(
        (status = 200, description = "Diagnostic snapshot", body = InspectorResponse)
    )
)]
pub async fn get_inspector(State(state): State<SharedState>) -> ApiResult<Json<InspectorResponse>> {
    let notifier = state.notifier();
    let registry = notifier.registry();
    let dispatcher = notifier.dispatcher();

    let config = serde_json::to_value(state.config()).map_err(|e| ApiError::InternalError {
        error_code: "CONFIG_SERIALIZE_FAILED".to_string(),
        message: "Failed to serialize configuration".to_string(),
        details: Some(e.to_string()),
    })?;

    Ok(Json(InspectorResponse {
        running: registry.is_running(),
        interval_secs: registry.interval().as_secs(),
        notifications_enabled: dispatcher.notifications_enabled(),
        endpoint: dispatcher.endpoint().to_string(),
        uptime_secs: state.uptime_secs(),
        sources: registry.snapshot(),
        stats: dispatcher.stats(),
        last_event: dispatcher.last_event(),
        config,
    }))
}
