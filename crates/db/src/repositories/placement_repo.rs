//! Repository for the `timeline_placements` table.

use cutline_core::placement::{NewPlacement, Placement};
use cutline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::placement::{AnchorColumns, PlacementRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, episode_id, placement_type, target_id, scene_id, attachment_point, \
                       offset_seconds, timestamp_seconds, track_number, z_index, duration, \
                       visual_role, label, character, properties, created_at, updated_at";

/// Provides CRUD operations for timeline placements.
pub struct PlacementRepo;

impl PlacementRepo {
    /// Insert a validated placement, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewPlacement,
    ) -> Result<PlacementRow, sqlx::Error> {
        let anchor = AnchorColumns::from(&input.anchor);
        let query = format!(
            "INSERT INTO timeline_placements \
                (episode_id, placement_type, target_id, scene_id, attachment_point, \
                 offset_seconds, timestamp_seconds, track_number, z_index, duration, \
                 visual_role, label, character, properties) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlacementRow>(&query)
            .bind(input.episode_id)
            .bind(input.kind.as_str())
            .bind(input.target_id)
            .bind(anchor.scene_id)
            .bind(anchor.attachment_point)
            .bind(anchor.offset_seconds)
            .bind(anchor.timestamp_seconds)
            .bind(input.track_number)
            .bind(input.z_index)
            .bind(input.duration)
            .bind(input.visual_role.as_str())
            .bind(&input.label)
            .bind(&input.character)
            .bind(serde_json::Value::Object(input.properties.clone()))
            .fetch_one(executor)
            .await
    }

    /// Find a placement by id within an episode.
    pub async fn find_by_id(
        pool: &PgPool,
        episode_id: DbId,
        id: DbId,
    ) -> Result<Option<PlacementRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM timeline_placements WHERE id = $1 AND episode_id = $2");
        sqlx::query_as::<_, PlacementRow>(&query)
            .bind(id)
            .bind(episode_id)
            .fetch_optional(pool)
            .await
    }

    /// List all placements of an episode in creation order.
    pub async fn list_for_episode(
        pool: &PgPool,
        episode_id: DbId,
    ) -> Result<Vec<PlacementRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM timeline_placements WHERE episode_id = $1 ORDER BY id");
        sqlx::query_as::<_, PlacementRow>(&query)
            .bind(episode_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the mutable columns of a placement. The full anchor is
    /// written so a re-anchor clears the columns of the previous variant.
    ///
    /// Returns `None` if no row with the given `id` exists in the episode.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        placement: &Placement,
    ) -> Result<Option<PlacementRow>, sqlx::Error> {
        let anchor = AnchorColumns::from(&placement.anchor);
        let query = format!(
            "UPDATE timeline_placements SET \
                scene_id = $3, \
                attachment_point = $4, \
                offset_seconds = $5, \
                timestamp_seconds = $6, \
                track_number = $7, \
                z_index = $8, \
                duration = $9, \
                visual_role = $10, \
                label = $11, \
                character = $12, \
                properties = $13, \
                updated_at = now() \
             WHERE id = $1 AND episode_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlacementRow>(&query)
            .bind(placement.id)
            .bind(placement.episode_id)
            .bind(anchor.scene_id)
            .bind(anchor.attachment_point)
            .bind(anchor.offset_seconds)
            .bind(anchor.timestamp_seconds)
            .bind(placement.track_number)
            .bind(placement.z_index)
            .bind(placement.duration)
            .bind(placement.visual_role.as_str())
            .bind(&placement.label)
            .bind(&placement.character)
            .bind(serde_json::Value::Object(placement.properties.clone()))
            .fetch_optional(executor)
            .await
    }

    /// Delete a placement. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, episode_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM timeline_placements WHERE id = $1 AND episode_id = $2")
            .bind(id)
            .bind(episode_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
