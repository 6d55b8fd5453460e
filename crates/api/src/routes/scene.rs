use axum::routing::delete;
use axum::Router;

use crate::handlers::scene;
use crate::state::AppState;

/// Routes mounted at `/episodes/{episode_id}/scenes`.
///
/// ```text
/// DELETE /{scene_id}  -> remove (?policy=orphan|cascade|reattach)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{scene_id}", delete(scene::remove))
}
