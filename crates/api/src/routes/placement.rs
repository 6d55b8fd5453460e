//! Route definitions for timeline placements.

use axum::routing::get;
use axum::Router;

use crate::handlers::placement;
use crate::state::AppState;

/// Routes mounted at `/episodes/{episode_id}/timeline/placements`.
///
/// ```text
/// GET    /              -> list (?kind=&track_number=&scene_id=)
/// POST   /              -> create
/// GET    /{id}          -> get
/// PATCH  /{id}          -> update
/// DELETE /{id}          -> delete
/// GET    /{id}/resolve  -> resolve one
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(placement::list).post(placement::create))
        .route(
            "/{id}",
            get(placement::get_by_id)
                .patch(placement::update)
                .delete(placement::delete),
        )
        .route("/{id}/resolve", get(placement::resolve))
}
