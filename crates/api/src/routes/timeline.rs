//! Route definitions for whole-timeline reads.

use axum::routing::get;
use axum::Router;

use crate::handlers::timeline;
use crate::state::AppState;

/// Routes mounted at `/episodes/{episode_id}/timeline`.
///
/// ```text
/// GET /                  -> resolve
/// GET /wardrobe/current  -> current wardrobe (?character=&scene_id=|scene_order=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(timeline::resolve))
        .route("/wardrobe/current", get(timeline::current_wardrobe))
}
