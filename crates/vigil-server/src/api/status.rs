//! Status screen endpoint.
//!
//! Mirrors what the on-device status view shows: the last event label, the
//! interval label and whether sources are running.

use axum::extract::State;
use axum::Json;
use vigil_core::StatusSnapshot;

use crate::state::SharedState;

/// Get the current status labels.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "updates",
    operation_id = "getStatus",
    summary = "Get status labels",
    description = "Returns the status label (the most recent event when labelling is on), \
        the interval label and the running flag as last applied on the UI context.",
    responses(
        (status = 200, description = "Current labels", body = StatusSnapshot)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusSnapshot> {
    Json(state.board().snapshot())
}
