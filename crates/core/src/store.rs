//! Storage seams consumed by the timeline service.
//!
//! The resolver never reaches into storage itself: the service fetches the
//! scene sequence and placement set through these traits and hands plain
//! slices to the pure functions.
//!
//! Scenes are edited outside this service, so a write cannot trust a scene
//! list it read earlier. Every write carries a [`WritePrecondition`] that the
//! store re-checks against the scene rows inside the same atomic unit as the
//! write itself.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::orphan::OrphanAction;
use crate::placement::{NewPlacement, Placement};
use crate::scene::{Scene, SceneIndex};
use crate::types::DbId;

/// Scene-sequence conditions a write must still satisfy when it commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePrecondition {
    /// Reject with [`CoreError::Conflict`] unless the episode's scene
    /// revision still equals this value.
    pub scene_revision: Option<String>,
    /// Reject with [`CoreError::NotFound`] unless this scene is still part of
    /// the episode.
    pub anchor_scene: Option<DbId>,
}

impl WritePrecondition {
    pub fn is_empty(&self) -> bool {
        self.scene_revision.is_none() && self.anchor_scene.is_none()
    }

    /// Check the precondition against the episode's current scenes.
    pub fn check(&self, scenes: &[Scene]) -> Result<(), CoreError> {
        if self.is_empty() {
            return Ok(());
        }
        let index = SceneIndex::build(scenes);

        if let Some(expected) = self.scene_revision.as_deref() {
            if expected != index.revision() {
                return Err(CoreError::Conflict(format!(
                    "Scene sequence changed (expected revision {expected}, current {}); \
                     re-read the timeline and retry",
                    index.revision()
                )));
            }
        }
        match self.anchor_scene {
            Some(scene_id) if !index.contains(scene_id) => Err(CoreError::NotFound {
                entity: "Scene",
                id: scene_id,
            }),
            _ => Ok(()),
        }
    }
}

/// Read-only access to an episode's scene sequence.
#[async_trait]
pub trait SceneSequenceProvider: Send + Sync {
    async fn episode_exists(&self, episode_id: DbId) -> Result<bool, CoreError>;

    /// All scenes of the episode, in any order.
    async fn list_scenes(&self, episode_id: DbId) -> Result<Vec<Scene>, CoreError>;
}

/// Durable placement records.
///
/// Writes check their [`WritePrecondition`] atomically with the write: no
/// scene edit may land between the check and the commit.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn list_placements(&self, episode_id: DbId) -> Result<Vec<Placement>, CoreError>;

    async fn find_placement(
        &self,
        episode_id: DbId,
        id: DbId,
    ) -> Result<Option<Placement>, CoreError>;

    async fn insert_placement(
        &self,
        input: &NewPlacement,
        precondition: &WritePrecondition,
    ) -> Result<Placement, CoreError>;

    /// Replace the mutable fields of an existing placement.
    ///
    /// Returns `None` if no placement with that id exists in the episode.
    async fn update_placement(
        &self,
        placement: &Placement,
        precondition: &WritePrecondition,
    ) -> Result<Option<Placement>, CoreError>;

    /// Returns `false` if nothing was deleted.
    async fn delete_placement(&self, episode_id: DbId, id: DbId) -> Result<bool, CoreError>;
}

/// Full backing store for the timeline service.
#[async_trait]
pub trait TimelineStore: SceneSequenceProvider + PlacementStore {
    /// Delete a scene and apply the planned placement actions atomically.
    ///
    /// The actions were planned against a scene snapshot; `precondition`
    /// carries that snapshot's revision so a plan made stale by a concurrent
    /// scene edit is rejected. Returns `false` if the scene did not exist.
    async fn remove_scene(
        &self,
        episode_id: DbId,
        scene_id: DbId,
        actions: &[OrphanAction],
        precondition: &WritePrecondition,
    ) -> Result<bool, CoreError>;

    async fn health_check(&self) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn scenes() -> Vec<Scene> {
        vec![
            Scene {
                id: 1,
                episode_id: 1,
                order_index: 1,
                duration_seconds: Some(10.0),
            },
            Scene {
                id: 2,
                episode_id: 1,
                order_index: 2,
                duration_seconds: Some(5.0),
            },
        ]
    }

    #[test]
    fn empty_precondition_always_holds() {
        assert!(WritePrecondition::default().check(&[]).is_ok());
    }

    #[test]
    fn matching_revision_and_present_scene_hold() {
        let pre = WritePrecondition {
            scene_revision: Some(SceneIndex::build(&scenes()).revision().to_string()),
            anchor_scene: Some(2),
        };
        assert!(pre.check(&scenes()).is_ok());
    }

    #[test]
    fn stale_revision_conflicts() {
        let pre = WritePrecondition {
            scene_revision: Some("stale".into()),
            anchor_scene: None,
        };
        assert_matches!(pre.check(&scenes()), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn missing_anchor_scene_is_not_found() {
        let pre = WritePrecondition {
            scene_revision: None,
            anchor_scene: Some(9),
        };
        assert_matches!(
            pre.check(&scenes()),
            Err(CoreError::NotFound { entity: "Scene", id: 9 })
        );
    }
}
