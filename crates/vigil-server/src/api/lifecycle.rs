//! Lifecycle transitions driven over HTTP.
//!
//! On a device these come from the host application. Here the binary emits
//! launch/activate and resign/background around its own run, and this
//! endpoint lets a developer inject any transition by hand.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vigil_core::formatter::lifecycle_tag;
use vigil_core::LifecycleEvent;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Result of a lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "event": "will-resign-active",
    "tag": "RESIGN_ACTIVE"
}))]
pub struct LifecycleResponse {
    /// Event name as given in the path.
    pub event: String,

    /// Tag sent to the diagnostic listener.
    pub tag: String,
}

/// Deliver a lifecycle transition.
#[utoipa::path(
    post,
    path = "/api/lifecycle/{event}",
    tag = "lifecycle",
    operation_id = "postLifecycleEvent",
    summary = "Simulate a lifecycle transition",
    description = "Notifies the transition like any other event and applies its policy: \
        resigning active restores the conservative interval; entering the background \
        suspends sources when background updates are off.",
    params(
        ("event" = String, Path, description = "One of did-finish-launching, did-become-active, \
            will-resign-active, will-enter-foreground, did-enter-background")
    ),
    responses(
        (status = 200, description = "Transition handled", body = LifecycleResponse),
        (status = 404, description = "Unknown event name", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn post_lifecycle_event(
    State(state): State<SharedState>,
    Path(event): Path<String>,
) -> ApiResult<Json<LifecycleResponse>> {
    let parsed: LifecycleEvent = event.parse()?;
    state.notifier().lifecycle(parsed);
    Ok(Json(LifecycleResponse {
        event: parsed.as_str().to_string(),
        tag: lifecycle_tag(parsed).to_string(),
    }))
}
