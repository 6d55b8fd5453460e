//! Timeline service: validated mutations and batch resolution over a store.
//!
//! Reads (listing, resolution) run concurrently. Mutations on one episode are
//! serialized in process through [`EpisodeLocks`]. Scene edits do not go
//! through this service, so scene checks travel to the store as a
//! [`WritePrecondition`] and are re-evaluated atomically with the write.
//! Writers may pass the `scene_revision` they last read so a write against a
//! scene list that has since changed is rejected instead of silently applied.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::CoreError;
use crate::orphan::{plan_scene_removal, OrphanAction, OrphanPolicy};
use crate::placement::{Placement, PlacementInput, PlacementKind, PlacementPatch};
use crate::resolver::{self, ResolvedTime, TimelineResolution};
use crate::scene::{Scene, SceneIndex};
use crate::store::{TimelineStore, WritePrecondition};
use crate::types::DbId;
use crate::validation::{apply_patch, validate_new_placement};
use crate::wardrobe::{current_wardrobe, SceneRef};

// ---------------------------------------------------------------------------
// Episode locks
// ---------------------------------------------------------------------------

/// Per-episode async mutexes serializing timeline mutations.
///
/// Entries nobody holds or waits on are pruned on the next acquire, so the
/// map stays bounded by the number of episodes with in-flight writes.
#[derive(Default)]
pub struct EpisodeLocks {
    locks: Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl EpisodeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive mutation access to `episode_id`.
    pub async fn acquire(&self, episode_id: DbId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Holders and waiters each own a clone; a count of 1 means idle.
            locks.retain(|id, lock| *id == episode_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(episode_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of episodes currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Filters for listing placements. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementFilter {
    pub kind: Option<PlacementKind>,
    pub track_number: Option<i32>,
    pub scene_id: Option<DbId>,
}

impl PlacementFilter {
    pub fn matches(&self, placement: &Placement) -> bool {
        self.kind.map_or(true, |k| placement.kind == k)
            && self.track_number.map_or(true, |t| placement.track_number == t)
            && self
                .scene_id
                .map_or(true, |s| placement.anchor.scene_id() == Some(s))
    }
}

/// Outcome of deleting a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRemoval {
    pub scene_id: DbId,
    pub policy: OrphanPolicy,
    pub actions: Vec<OrphanAction>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Entry point for every timeline operation. Cheap to clone.
#[derive(Clone)]
pub struct TimelineService {
    store: Arc<dyn TimelineStore>,
    locks: Arc<EpisodeLocks>,
    orphan_policy: OrphanPolicy,
}

impl TimelineService {
    pub fn new(store: Arc<dyn TimelineStore>, orphan_policy: OrphanPolicy) -> Self {
        Self {
            store,
            locks: Arc::new(EpisodeLocks::new()),
            orphan_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn TimelineStore> {
        &self.store
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    // -- Reads ---------------------------------------------------------------

    /// Resolve the whole episode timeline against the current scene list.
    pub async fn resolve_timeline(&self, episode_id: DbId) -> Result<TimelineResolution, CoreError> {
        let scenes = self.load_scenes(episode_id).await?;
        let placements = self.store.list_placements(episode_id).await?;

        let resolution = resolver::resolve_timeline(episode_id, &scenes, &placements);
        tracing::debug!(
            episode_id,
            scenes = scenes.len(),
            resolved = resolution.entries.len(),
            failed = resolution.failures.len(),
            conflicts = resolution.conflicts.len(),
            "Timeline resolved"
        );
        if !resolution.conflicts.is_empty() {
            tracing::warn!(
                episode_id,
                conflicts = resolution.conflicts.len(),
                "Overlapping primary-visual placements"
            );
        }
        Ok(resolution)
    }

    /// Resolve one placement. Fails with [`CoreError::Resolution`] if its
    /// anchor scene no longer exists.
    pub async fn resolve_placement(
        &self,
        episode_id: DbId,
        id: DbId,
    ) -> Result<ResolvedTime, CoreError> {
        let scenes = self.load_scenes(episode_id).await?;
        let placement = self.find_existing(episode_id, id).await?;
        resolver::resolve_placement(&placement, &scenes)
    }

    pub async fn get_placement(&self, episode_id: DbId, id: DbId) -> Result<Placement, CoreError> {
        self.ensure_episode(episode_id).await?;
        self.find_existing(episode_id, id).await
    }

    /// List placements ordered by track, scene-anchored before absolute, then
    /// creation order.
    pub async fn list_placements(
        &self,
        episode_id: DbId,
        filter: &PlacementFilter,
    ) -> Result<Vec<Placement>, CoreError> {
        self.ensure_episode(episode_id).await?;
        let mut placements: Vec<Placement> = self
            .store
            .list_placements(episode_id)
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        placements.sort_by_key(|p| (p.track_number, !p.anchor.is_scene_anchored(), p.id));
        Ok(placements)
    }

    /// Wardrobe cue in effect for `character` at the given scene.
    pub async fn current_wardrobe(
        &self,
        episode_id: DbId,
        character: &str,
        at: SceneRef,
    ) -> Result<Option<Placement>, CoreError> {
        let scenes = self.load_scenes(episode_id).await?;
        let placements = self.store.list_placements(episode_id).await?;
        Ok(current_wardrobe(character, at, &scenes, &placements)?.cloned())
    }

    // -- Mutations -----------------------------------------------------------

    /// Validate and persist a new placement.
    pub async fn create_placement(
        &self,
        episode_id: DbId,
        input: &PlacementInput,
        expected_scene_revision: Option<&str>,
    ) -> Result<Placement, CoreError> {
        let new = validate_new_placement(episode_id, input)?;
        let precondition = WritePrecondition {
            scene_revision: expected_scene_revision.map(str::to_owned),
            anchor_scene: new.anchor.scene_id(),
        };

        let _guard = self.locks.acquire(episode_id).await;
        self.ensure_episode(episode_id).await?;

        let placement = self.store.insert_placement(&new, &precondition).await?;
        tracing::info!(
            episode_id,
            placement_id = placement.id,
            kind = %placement.kind,
            track = placement.track_number,
            "Placement created"
        );
        Ok(placement)
    }

    /// Apply a partial update. Re-anchoring to a scene requires that scene to
    /// exist; other edits are allowed on orphaned placements.
    pub async fn update_placement(
        &self,
        episode_id: DbId,
        id: DbId,
        patch: &PlacementPatch,
        expected_scene_revision: Option<&str>,
    ) -> Result<Placement, CoreError> {
        let _guard = self.locks.acquire(episode_id).await;
        self.ensure_episode(episode_id).await?;
        let existing = self.find_existing(episode_id, id).await?;

        let updated = apply_patch(&existing, patch)?;
        let precondition = WritePrecondition {
            scene_revision: expected_scene_revision.map(str::to_owned),
            anchor_scene: if updated.anchor != existing.anchor {
                updated.anchor.scene_id()
            } else {
                None
            },
        };

        let saved = self
            .store
            .update_placement(&updated, &precondition)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Placement",
                id,
            })?;
        tracing::info!(episode_id, placement_id = id, "Placement updated");
        Ok(saved)
    }

    pub async fn delete_placement(&self, episode_id: DbId, id: DbId) -> Result<(), CoreError> {
        let _guard = self.locks.acquire(episode_id).await;
        self.ensure_episode(episode_id).await?;

        if !self.store.delete_placement(episode_id, id).await? {
            return Err(CoreError::NotFound {
                entity: "Placement",
                id,
            });
        }
        tracing::info!(episode_id, placement_id = id, "Placement removed from timeline");
        Ok(())
    }

    /// Delete a scene and apply the orphan policy (the configured default
    /// unless `policy` overrides it) to the placements anchored to it.
    pub async fn remove_scene(
        &self,
        episode_id: DbId,
        scene_id: DbId,
        policy: Option<OrphanPolicy>,
        expected_scene_revision: Option<&str>,
    ) -> Result<SceneRemoval, CoreError> {
        let policy = policy.unwrap_or(self.orphan_policy);

        let _guard = self.locks.acquire(episode_id).await;
        let scenes = self.load_scenes(episode_id).await?;
        let observed = SceneIndex::build(&scenes).revision().to_string();
        // The plan below depends on this snapshot, so the store re-checks it
        // even when the caller sent no revision.
        let precondition = WritePrecondition {
            scene_revision: Some(expected_scene_revision.map_or(observed, str::to_owned)),
            anchor_scene: None,
        };
        precondition.check(&scenes)?;
        if !scenes.iter().any(|s| s.id == scene_id) {
            return Err(CoreError::NotFound {
                entity: "Scene",
                id: scene_id,
            });
        }

        let placements = self.store.list_placements(episode_id).await?;
        let actions = plan_scene_removal(scene_id, &scenes, &placements, policy);

        let removed = self
            .store
            .remove_scene(episode_id, scene_id, &actions, &precondition)
            .await?;
        if !removed {
            return Err(CoreError::NotFound {
                entity: "Scene",
                id: scene_id,
            });
        }
        tracing::info!(
            episode_id,
            scene_id,
            %policy,
            affected = actions.len(),
            "Scene removed"
        );
        Ok(SceneRemoval {
            scene_id,
            policy,
            actions,
        })
    }

    pub async fn health_check(&self) -> Result<(), CoreError> {
        self.store.health_check().await
    }

    // -- Helpers -------------------------------------------------------------

    async fn ensure_episode(&self, episode_id: DbId) -> Result<(), CoreError> {
        if self.store.episode_exists(episode_id).await? {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "Episode",
                id: episode_id,
            })
        }
    }

    async fn load_scenes(&self, episode_id: DbId) -> Result<Vec<Scene>, CoreError> {
        self.ensure_episode(episode_id).await?;
        self.store.list_scenes(episode_id).await
    }

    async fn find_existing(&self, episode_id: DbId, id: DbId) -> Result<Placement, CoreError> {
        self.store
            .find_placement(episode_id, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Placement",
                id,
            })
    }
}
