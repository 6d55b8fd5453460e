//! [`TimelineStore`] implementation over Postgres.
//!
//! Every write runs in one transaction that first locks the episode row and
//! share-locks its scene rows, then checks the [`WritePrecondition`] against
//! those rows, then writes. A concurrent scene edit either commits before the
//! check (and is seen) or waits until the write commits.

use async_trait::async_trait;
use cutline_core::error::CoreError;
use cutline_core::orphan::OrphanAction;
use cutline_core::placement::{NewPlacement, Placement};
use cutline_core::scene::Scene;
use cutline_core::store::{
    PlacementStore, SceneSequenceProvider, TimelineStore, WritePrecondition,
};
use cutline_core::types::DbId;
use sqlx::{Postgres, Transaction};

use crate::repositories::{PlacementRepo, SceneRepo};
use crate::DbPool;

/// Postgres-backed store. Cheap to clone (the pool is reference counted).
#[derive(Clone)]
pub struct PgTimelineStore {
    pool: DbPool,
}

impl PgTimelineStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Open a write transaction holding the episode lock, with `precondition`
    /// already verified against the locked scene rows.
    async fn begin_write(
        &self,
        episode_id: DbId,
        precondition: &WritePrecondition,
    ) -> Result<Transaction<'static, Postgres>, CoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        if !SceneRepo::lock_episode(&mut *tx, episode_id)
            .await
            .map_err(store_error)?
        {
            return Err(CoreError::NotFound {
                entity: "Episode",
                id: episode_id,
            });
        }
        let scenes: Vec<Scene> = SceneRepo::list_for_share(&mut *tx, episode_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Scene::from)
            .collect();
        precondition.check(&scenes)?;
        Ok(tx)
    }
}

/// Map a sqlx error onto the domain error callers see.
///
/// Unique violations are conflicts and check violations are invalid input;
/// everything else is internal and only its detail is logged.
pub(crate) fn store_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some("23505") => {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
            Some("23514") => {
                return CoreError::Validation(format!(
                    "Value violates check constraint: {constraint}"
                ));
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Timeline store query failed");
    CoreError::Internal(format!("database error: {err}"))
}

#[async_trait]
impl SceneSequenceProvider for PgTimelineStore {
    async fn episode_exists(&self, episode_id: DbId) -> Result<bool, CoreError> {
        SceneRepo::episode_exists(&self.pool, episode_id)
            .await
            .map_err(store_error)
    }

    async fn list_scenes(&self, episode_id: DbId) -> Result<Vec<Scene>, CoreError> {
        let rows = SceneRepo::list_for_episode(&self.pool, episode_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Scene::from).collect())
    }
}

#[async_trait]
impl PlacementStore for PgTimelineStore {
    async fn list_placements(&self, episode_id: DbId) -> Result<Vec<Placement>, CoreError> {
        PlacementRepo::list_for_episode(&self.pool, episode_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Placement::try_from)
            .collect()
    }

    async fn find_placement(
        &self,
        episode_id: DbId,
        id: DbId,
    ) -> Result<Option<Placement>, CoreError> {
        PlacementRepo::find_by_id(&self.pool, episode_id, id)
            .await
            .map_err(store_error)?
            .map(Placement::try_from)
            .transpose()
    }

    async fn insert_placement(
        &self,
        input: &NewPlacement,
        precondition: &WritePrecondition,
    ) -> Result<Placement, CoreError> {
        let mut tx = self.begin_write(input.episode_id, precondition).await?;
        let row = PlacementRepo::create(&mut *tx, input)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        Placement::try_from(row)
    }

    async fn update_placement(
        &self,
        placement: &Placement,
        precondition: &WritePrecondition,
    ) -> Result<Option<Placement>, CoreError> {
        let mut tx = self.begin_write(placement.episode_id, precondition).await?;
        let row = PlacementRepo::update(&mut *tx, placement)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        row.map(Placement::try_from).transpose()
    }

    async fn delete_placement(&self, episode_id: DbId, id: DbId) -> Result<bool, CoreError> {
        PlacementRepo::delete(&self.pool, episode_id, id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl TimelineStore for PgTimelineStore {
    async fn remove_scene(
        &self,
        episode_id: DbId,
        scene_id: DbId,
        actions: &[OrphanAction],
        precondition: &WritePrecondition,
    ) -> Result<bool, CoreError> {
        let mut tx = self.begin_write(episode_id, precondition).await?;
        let removed = SceneRepo::delete_with_placements(&mut *tx, episode_id, scene_id, actions)
            .await
            .map_err(store_error)?;
        if removed {
            tx.commit().await.map_err(store_error)?;
        }
        Ok(removed)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}
