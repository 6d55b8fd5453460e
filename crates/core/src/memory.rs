//! In-process [`TimelineStore`] backed by ordered maps.
//!
//! Selected with `TIMELINE_STORE=memory` for local development and used by
//! the API integration tests. State lives for the lifetime of the process.
//! Write preconditions are checked under the same write lock that scene
//! upserts take, so they are atomic with the write.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::orphan::OrphanAction;
use crate::placement::{NewPlacement, Placement};
use crate::scene::Scene;
use crate::store::{PlacementStore, SceneSequenceProvider, TimelineStore, WritePrecondition};
use crate::types::DbId;

#[derive(Default)]
struct MemoryState {
    episodes: BTreeSet<DbId>,
    scenes: BTreeMap<DbId, Scene>,
    placements: BTreeMap<DbId, Placement>,
    last_placement_id: DbId,
}

impl MemoryState {
    fn scenes_of(&self, episode_id: DbId) -> Vec<Scene> {
        self.scenes
            .values()
            .filter(|s| s.episode_id == episode_id)
            .cloned()
            .collect()
    }
}

/// Thread-safe via interior `RwLock`; wrap in `Arc` to share.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_episode(&self, episode_id: DbId) {
        self.state.write().await.episodes.insert(episode_id);
    }

    /// Insert or replace a scene. Registers its episode if needed.
    pub async fn upsert_scene(&self, scene: Scene) {
        let mut state = self.state.write().await;
        state.episodes.insert(scene.episode_id);
        state.scenes.insert(scene.id, scene);
    }
}

#[async_trait]
impl SceneSequenceProvider for InMemoryStore {
    async fn episode_exists(&self, episode_id: DbId) -> Result<bool, CoreError> {
        Ok(self.state.read().await.episodes.contains(&episode_id))
    }

    async fn list_scenes(&self, episode_id: DbId) -> Result<Vec<Scene>, CoreError> {
        Ok(self.state.read().await.scenes_of(episode_id))
    }
}

#[async_trait]
impl PlacementStore for InMemoryStore {
    async fn list_placements(&self, episode_id: DbId) -> Result<Vec<Placement>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .placements
            .values()
            .filter(|p| p.episode_id == episode_id)
            .cloned()
            .collect())
    }

    async fn find_placement(
        &self,
        episode_id: DbId,
        id: DbId,
    ) -> Result<Option<Placement>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .placements
            .get(&id)
            .filter(|p| p.episode_id == episode_id)
            .cloned())
    }

    async fn insert_placement(
        &self,
        input: &NewPlacement,
        precondition: &WritePrecondition,
    ) -> Result<Placement, CoreError> {
        let mut state = self.state.write().await;
        precondition.check(&state.scenes_of(input.episode_id))?;
        state.last_placement_id += 1;
        let placement = input
            .clone()
            .into_placement(state.last_placement_id, chrono::Utc::now());
        state.placements.insert(placement.id, placement.clone());
        Ok(placement)
    }

    async fn update_placement(
        &self,
        placement: &Placement,
        precondition: &WritePrecondition,
    ) -> Result<Option<Placement>, CoreError> {
        let mut state = self.state.write().await;
        precondition.check(&state.scenes_of(placement.episode_id))?;
        let Some(stored) = state
            .placements
            .get_mut(&placement.id)
            .filter(|p| p.episode_id == placement.episode_id)
        else {
            return Ok(None);
        };
        *stored = Placement {
            id: stored.id,
            episode_id: stored.episode_id,
            kind: stored.kind,
            target_id: stored.target_id,
            created_at: stored.created_at,
            updated_at: chrono::Utc::now(),
            ..placement.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete_placement(&self, episode_id: DbId, id: DbId) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        let owned = state
            .placements
            .get(&id)
            .is_some_and(|p| p.episode_id == episode_id);
        if owned {
            state.placements.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl TimelineStore for InMemoryStore {
    async fn remove_scene(
        &self,
        episode_id: DbId,
        scene_id: DbId,
        actions: &[OrphanAction],
        precondition: &WritePrecondition,
    ) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        precondition.check(&state.scenes_of(episode_id))?;
        if !state
            .scenes
            .get(&scene_id)
            .is_some_and(|s| s.episode_id == episode_id)
        {
            return Ok(false);
        }
        state.scenes.remove(&scene_id);

        let now = chrono::Utc::now();
        for action in actions {
            match action {
                OrphanAction::Keep { .. } => {}
                OrphanAction::Delete { placement_id } => {
                    state.placements.remove(placement_id);
                }
                OrphanAction::Reanchor {
                    placement_id,
                    anchor,
                } => {
                    if let Some(p) = state.placements.get_mut(placement_id) {
                        p.anchor = *anchor;
                        p.updated_at = now;
                    }
                }
            }
        }
        Ok(true)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
