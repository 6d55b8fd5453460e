//! Repository for the `episodes` and `episode_scenes` tables.

use cutline_core::orphan::OrphanAction;
use cutline_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::placement::AnchorColumns;
use crate::models::scene::SceneRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, episode_id, scene_order, title, duration_seconds, \
                       trim_start, trim_end, created_at, updated_at";

/// Read access to scene sequences plus scene removal.
pub struct SceneRepo;

impl SceneRepo {
    pub async fn episode_exists(pool: &PgPool, episode_id: DbId) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM episodes WHERE id = $1)")
                .bind(episode_id)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    /// Lock the episode row for the rest of the transaction.
    ///
    /// `FOR UPDATE` also conflicts with the key-share lock a foreign-key check
    /// takes, so no scene can be added to the episode until the lock is
    /// released. Returns `false` if the episode does not exist.
    pub async fn lock_episode(
        conn: &mut PgConnection,
        episode_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let locked: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM episodes WHERE id = $1 FOR UPDATE")
                .bind(episode_id)
                .fetch_optional(conn)
                .await?;
        Ok(locked.is_some())
    }

    /// List the scenes of an episode, ordered by scene_order, then id.
    pub async fn list_for_episode<'e>(
        executor: impl PgExecutor<'e>,
        episode_id: DbId,
    ) -> Result<Vec<SceneRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM episode_scenes \
             WHERE episode_id = $1 \
             ORDER BY scene_order, id"
        );
        sqlx::query_as::<_, SceneRow>(&query)
            .bind(episode_id)
            .fetch_all(executor)
            .await
    }

    /// Like [`list_for_episode`](Self::list_for_episode), but share-locks the
    /// rows so they cannot be updated or deleted until the transaction ends.
    pub async fn list_for_share(
        conn: &mut PgConnection,
        episode_id: DbId,
    ) -> Result<Vec<SceneRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM episode_scenes \
             WHERE episode_id = $1 \
             ORDER BY scene_order, id \
             FOR SHARE"
        );
        sqlx::query_as::<_, SceneRow>(&query)
            .bind(episode_id)
            .fetch_all(conn)
            .await
    }

    /// Delete a scene and apply the planned placement actions on the caller's
    /// transaction.
    ///
    /// Returns `false` if the scene does not belong to the episode, in which
    /// case nothing was written.
    pub async fn delete_with_placements(
        conn: &mut PgConnection,
        episode_id: DbId,
        scene_id: DbId,
        actions: &[OrphanAction],
    ) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM episode_scenes WHERE id = $1 AND episode_id = $2")
            .bind(scene_id)
            .bind(episode_id)
            .execute(&mut *conn)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        for action in actions {
            match action {
                OrphanAction::Keep { .. } => {}
                OrphanAction::Delete { placement_id } => {
                    sqlx::query("DELETE FROM timeline_placements WHERE id = $1 AND episode_id = $2")
                        .bind(*placement_id)
                        .bind(episode_id)
                        .execute(&mut *conn)
                        .await?;
                }
                OrphanAction::Reanchor {
                    placement_id,
                    anchor,
                } => {
                    let cols = AnchorColumns::from(anchor);
                    sqlx::query(
                        "UPDATE timeline_placements SET \
                            scene_id = $3, attachment_point = $4, \
                            offset_seconds = $5, timestamp_seconds = $6, \
                            updated_at = now() \
                         WHERE id = $1 AND episode_id = $2",
                    )
                    .bind(*placement_id)
                    .bind(episode_id)
                    .bind(cols.scene_id)
                    .bind(cols.attachment_point)
                    .bind(cols.offset_seconds)
                    .bind(cols.timestamp_seconds)
                    .execute(&mut *conn)
                    .await?;
                }
            }
        }

        Ok(true)
    }
}
