//! Handlers for `/episodes/{episode_id}/timeline/placements`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cutline_core::placement::{PlacementInput, PlacementPatch};
use cutline_core::types::DbId;

use crate::error::AppResult;
use crate::query::{PlacementListParams, RevisionParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/episodes/{episode_id}/timeline/placements?kind=&track_number=&scene_id=
pub async fn list(
    State(state): State<AppState>,
    Path(episode_id): Path<DbId>,
    Query(params): Query<PlacementListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let placements = state.service.list_placements(episode_id, &filter).await?;
    Ok(Json(DataResponse { data: placements }))
}

/// POST /api/v1/episodes/{episode_id}/timeline/placements
///
/// Validate and store a placement. Returns 201 with the stored record.
pub async fn create(
    State(state): State<AppState>,
    Path(episode_id): Path<DbId>,
    Query(revision): Query<RevisionParams>,
    Json(input): Json<PlacementInput>,
) -> AppResult<impl IntoResponse> {
    let placement = state
        .service
        .create_placement(
            episode_id,
            &input,
            revision.expected_scene_revision.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: placement })))
}

/// GET /api/v1/episodes/{episode_id}/timeline/placements/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((episode_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let placement = state.service.get_placement(episode_id, id).await?;
    Ok(Json(DataResponse { data: placement }))
}

/// PATCH /api/v1/episodes/{episode_id}/timeline/placements/{id}
///
/// Partial update. `null` clears `duration`, `label` and `character`.
pub async fn update(
    State(state): State<AppState>,
    Path((episode_id, id)): Path<(DbId, DbId)>,
    Query(revision): Query<RevisionParams>,
    Json(patch): Json<PlacementPatch>,
) -> AppResult<impl IntoResponse> {
    let placement = state
        .service
        .update_placement(
            episode_id,
            id,
            &patch,
            revision.expected_scene_revision.as_deref(),
        )
        .await?;
    Ok(Json(DataResponse { data: placement }))
}

/// DELETE /api/v1/episodes/{episode_id}/timeline/placements/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path((episode_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    state.service.delete_placement(episode_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/episodes/{episode_id}/timeline/placements/{id}/resolve
///
/// Resolve a single placement; 422 if its anchor scene is gone.
pub async fn resolve(
    State(state): State<AppState>,
    Path((episode_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let time = state.service.resolve_placement(episode_id, id).await?;
    Ok(Json(DataResponse { data: time }))
}
