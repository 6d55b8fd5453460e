//! Query parameter types shared by the timeline handlers.

use cutline_core::error::CoreError;
use cutline_core::orphan::OrphanPolicy;
use cutline_core::placement::PlacementKind;
use cutline_core::service::PlacementFilter;
use cutline_core::types::DbId;
use cutline_core::wardrobe::SceneRef;
use serde::Deserialize;

/// Optimistic concurrency token (`?expected_scene_revision=`) accepted by
/// every mutating endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RevisionParams {
    #[serde(alias = "expectedSceneRevision")]
    pub expected_scene_revision: Option<String>,
}

/// `?kind=&track_number=&scene_id=` for placement listing.
#[derive(Debug, Default, Deserialize)]
pub struct PlacementListParams {
    #[serde(alias = "placementType")]
    pub kind: Option<String>,
    #[serde(alias = "trackNumber")]
    pub track_number: Option<i32>,
    #[serde(alias = "sceneId")]
    pub scene_id: Option<DbId>,
}

impl PlacementListParams {
    pub fn into_filter(self) -> Result<PlacementFilter, CoreError> {
        Ok(PlacementFilter {
            kind: self
                .kind
                .as_deref()
                .map(str::parse::<PlacementKind>)
                .transpose()?,
            track_number: self.track_number,
            scene_id: self.scene_id,
        })
    }
}

/// `?character=&scene_id=` or `?character=&scene_order=`.
#[derive(Debug, Deserialize)]
pub struct WardrobeParams {
    pub character: Option<String>,
    #[serde(alias = "sceneId")]
    pub scene_id: Option<DbId>,
    #[serde(alias = "sceneOrder", alias = "episodeOrder")]
    pub scene_order: Option<i32>,
}

impl WardrobeParams {
    pub fn character(&self) -> Result<&str, CoreError> {
        self.character
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CoreError::validation("character is required"))
    }

    pub fn scene_ref(&self) -> Result<SceneRef, CoreError> {
        match (self.scene_id, self.scene_order) {
            (Some(id), None) => Ok(SceneRef::Id(id)),
            (None, Some(order)) => Ok(SceneRef::Order(order)),
            (Some(_), Some(_)) => Err(CoreError::validation(
                "Give either scene_id or scene_order, not both",
            )),
            (None, None) => Err(CoreError::validation("scene_id or scene_order is required")),
        }
    }
}

/// `?policy=&expected_scene_revision=` for scene removal.
#[derive(Debug, Default, Deserialize)]
pub struct SceneRemovalParams {
    pub policy: Option<String>,
    #[serde(alias = "expectedSceneRevision")]
    pub expected_scene_revision: Option<String>,
}

impl SceneRemovalParams {
    pub fn policy(&self) -> Result<Option<OrphanPolicy>, CoreError> {
        self.policy
            .as_deref()
            .map(str::parse::<OrphanPolicy>)
            .transpose()
    }
}
