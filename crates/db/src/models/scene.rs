//! Scene rows from `episode_scenes`.

use cutline_core::scene::{trimmed_duration, Scene};
use cutline_core::types::{DbId, Seconds, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `episode_scenes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SceneRow {
    pub id: DbId,
    pub episode_id: DbId,
    pub scene_order: i32,
    pub title: Option<String>,
    pub duration_seconds: Option<Seconds>,
    pub trim_start: Option<Seconds>,
    pub trim_end: Option<Seconds>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SceneRow> for Scene {
    fn from(row: SceneRow) -> Self {
        Scene {
            id: row.id,
            episode_id: row.episode_id,
            order_index: row.scene_order,
            duration_seconds: trimmed_duration(row.duration_seconds, row.trim_start, row.trim_end),
        }
    }
}
