pub mod health;
pub mod placement;
pub mod scene;
pub mod timeline;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /episodes/{episode_id}/timeline                          resolve (GET)
/// /episodes/{episode_id}/timeline/wardrobe/current         current wardrobe (GET)
/// /episodes/{episode_id}/timeline/placements               list, create
/// /episodes/{episode_id}/timeline/placements/{id}          get, update, delete
/// /episodes/{episode_id}/timeline/placements/{id}/resolve  resolve one (GET)
/// /episodes/{episode_id}/scenes/{scene_id}                 delete (?policy=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/episodes/{episode_id}/timeline", timeline::router())
        .nest(
            "/episodes/{episode_id}/timeline/placements",
            placement::router(),
        )
        .nest("/episodes/{episode_id}/scenes", scene::router())
}
