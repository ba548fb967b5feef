//! Start/stop and sampling interval commands.
//!
//! These are the same three actions the on-device controls offer. Each one
//! also emits a control ping (`START_UPDATES`, `STOP_UPDATES`,
//! `SET_INTERVAL`) through the dispatcher.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the updates router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/start", post(start_updates))
        .route("/stop", post(stop_updates))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Result of a start or stop command.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "running": true,
    "sources_started": 8
}))]
pub struct UpdatesResponse {
    /// Running state after the command.
    pub running: bool,

    /// Sources started by this command (always 0 for stop).
    #[schema(example = 8, minimum = 0)]
    pub sources_started: usize,
}

/// Request body for changing the sampling interval.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "seconds": 5.0 }))]
pub struct SetIntervalRequest {
    /// New interval in seconds. The on-device presets are 1, 5 and 10; any
    /// positive value is accepted.
    #[schema(example = 5.0)]
    pub seconds: f64,
}

/// Current motion sampling interval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "seconds": 10.0, "label": "10s" }))]
pub struct IntervalResponse {
    /// Interval in seconds.
    pub seconds: f64,

    /// Interval as shown on the status screen.
    #[schema(example = "10s")]
    pub label: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start every available, authorized, enabled source.
#[utoipa::path(
    post,
    path = "/api/updates/start",
    tag = "updates",
    operation_id = "startUpdates",
    summary = "Start all sources",
    description = "Restarts every usable source. Calling it while already running never \
        leaves duplicate subscriptions.",
    responses(
        (status = 200, description = "Sources started", body = UpdatesResponse)
    )
)]
pub async fn start_updates(State(state): State<SharedState>) -> Json<UpdatesResponse> {
    let sources_started = state.notifier().start_updates();
    info!(sources_started, "updates started via API");
    Json(UpdatesResponse {
        running: true,
        sources_started,
    })
}

/// Stop every source.
#[utoipa::path(
    post,
    path = "/api/updates/stop",
    tag = "updates",
    operation_id = "stopUpdates",
    summary = "Stop all sources",
    description = "Stops every active subscription including beacon ranging. No source \
        event is reported after this returns.",
    responses(
        (status = 200, description = "Sources stopped", body = UpdatesResponse)
    )
)]
pub async fn stop_updates(State(state): State<SharedState>) -> Json<UpdatesResponse> {
    state.notifier().stop_updates();
    info!("updates stopped via API");
    Json(UpdatesResponse {
        running: false,
        sources_started: 0,
    })
}

/// Get the motion sampling interval.
#[utoipa::path(
    get,
    path = "/api/interval",
    tag = "updates",
    operation_id = "getInterval",
    summary = "Get sampling interval",
    responses(
        (status = 200, description = "Current interval", body = IntervalResponse)
    )
)]
pub async fn get_interval(State(state): State<SharedState>) -> Json<IntervalResponse> {
    let interval = state.notifier().registry().interval();
    Json(IntervalResponse {
        seconds: interval.as_secs(),
        label: interval.to_string(),
    })
}

/// Change the motion sampling interval.
#[utoipa::path(
    put,
    path = "/api/interval",
    tag = "updates",
    operation_id = "setInterval",
    summary = "Set sampling interval",
    description = "Applies the interval to every motion source in place, running or not.",
    request_body = SetIntervalRequest,
    responses(
        (status = 200, description = "Interval applied", body = IntervalResponse),
        (status = 400, description = "Interval is not a positive number", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn set_interval(
    State(state): State<SharedState>,
    Json(request): Json<SetIntervalRequest>,
) -> ApiResult<Json<IntervalResponse>> {
    let interval = state.notifier().set_interval(request.seconds)?;
    Ok(Json(IntervalResponse {
        seconds: interval.as_secs(),
        label: interval.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_interval_request_deserialization() {
        let request: SetIntervalRequest = serde_json::from_str(r#"{"seconds": 1}"#).unwrap();
        assert!((request.seconds - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_updates_response_serialization() {
        let json = serde_json::to_string(&UpdatesResponse {
            running: false,
            sources_started: 0,
        })
        .unwrap();
        assert_eq!(json, r#"{"running":false,"sources_started":0}"#);
    }
}
