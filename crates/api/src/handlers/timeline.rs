//! Handlers for whole-episode timeline reads.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use cutline_core::types::DbId;

use crate::error::AppResult;
use crate::query::WardrobeParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/episodes/{episode_id}/timeline
///
/// Resolved entries in render order, plus failures and primary-visual
/// conflicts. Partial failures still return 200.
pub async fn resolve(
    State(state): State<AppState>,
    Path(episode_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let resolution = state.service.resolve_timeline(episode_id).await?;
    Ok(Json(DataResponse { data: resolution }))
}

/// GET /api/v1/episodes/{episode_id}/timeline/wardrobe/current?character=&scene_id=
///
/// `data` is `null` when the character has no wardrobe cue up to that scene.
pub async fn current_wardrobe(
    State(state): State<AppState>,
    Path(episode_id): Path<DbId>,
    Query(params): Query<WardrobeParams>,
) -> AppResult<impl IntoResponse> {
    let character = params.character()?;
    let at = params.scene_ref()?;
    let placement = state
        .service
        .current_wardrobe(episode_id, character, at)
        .await?;
    Ok(Json(DataResponse { data: placement }))
}
