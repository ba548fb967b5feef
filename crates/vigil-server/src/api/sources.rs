//! Per-source inspection and runtime toggles.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use vigil_core::{SourceId, SourceStatus, VigilError};

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the sources router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_sources))
        .route("/{source}", put(set_source_enabled))
}

/// Request body for toggling a source.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "enabled": false }))]
pub struct SetSourceRequest {
    /// Whether the source should deliver readings.
    pub enabled: bool,
}

/// List every registered source.
#[utoipa::path(
    get,
    path = "/api/sources",
    tag = "sources",
    operation_id = "listSources",
    summary = "List sources",
    description = "Returns availability, authorization, enablement and activity for every \
        registered source, beacon regions included.",
    responses(
        (status = 200, description = "Registered sources", body = Vec<SourceStatus>)
    )
)]
pub async fn list_sources(State(state): State<SharedState>) -> Json<Vec<SourceStatus>> {
    Json(state.notifier().registry().snapshot())
}

/// Enable or disable one source.
#[utoipa::path(
    put,
    path = "/api/sources/{source}",
    tag = "sources",
    operation_id = "setSourceEnabled",
    summary = "Enable or disable a source",
    description = "Disabling stops the source immediately. Enabling starts it when updates \
        are running and the source is available and authorized.",
    params(
        ("source" = String, Path, description = "Source name, e.g. `gyroscope` or `beacon-ranging:<uuid>`")
    ),
    request_body = SetSourceRequest,
    responses(
        (status = 200, description = "Updated source", body = SourceStatus),
        (status = 404, description = "No such source", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn set_source_enabled(
    State(state): State<SharedState>,
    Path(source): Path<String>,
    Json(request): Json<SetSourceRequest>,
) -> ApiResult<Json<SourceStatus>> {
    let id: SourceId = source.parse()?;
    let registry = state.notifier().registry();
    registry.set_enabled(id, request.enabled)?;
    info!(source = %id, enabled = request.enabled, "source toggled via API");

    let name = id.to_string();
    let status = registry
        .snapshot()
        .into_iter()
        .find(|s| s.source == name)
        .ok_or(VigilError::UnknownSource(name))?;
    Ok(Json(status))
}
