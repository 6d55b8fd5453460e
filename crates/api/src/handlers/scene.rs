use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use cutline_core::types::DbId;

use crate::error::AppResult;
use crate::query::SceneRemovalParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// DELETE /api/v1/episodes/{episode_id}/scenes/{scene_id}?policy=
///
/// Remove a scene and apply the orphan policy (server default unless
/// overridden) to placements anchored to it. Returns the applied actions.
pub async fn remove(
    State(state): State<AppState>,
    Path((episode_id, scene_id)): Path<(DbId, DbId)>,
    Query(params): Query<SceneRemovalParams>,
) -> AppResult<impl IntoResponse> {
    let policy = params.policy()?;
    let removal = state
        .service
        .remove_scene(
            episode_id,
            scene_id,
            policy,
            params.expected_scene_revision.as_deref(),
        )
        .await?;
    Ok(Json(DataResponse { data: removal }))
}
