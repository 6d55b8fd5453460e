//! Time resolver: maps placement anchors onto absolute episode time.
//!
//! Resolution is a pure function of the placement and the current scene list.
//! Nothing here is cached; callers re-resolve after any scene edit, which is
//! what keeps scene-anchored placements glued to their cut while absolute
//! placements stay put.

use serde::Serialize;

use crate::error::CoreError;
use crate::layering::{self, PlacementConflict, ResolvedPlacement};
use crate::placement::{Anchor, Placement};
use crate::scene::{Scene, SceneIndex};
use crate::types::{DbId, Seconds};

/// Absolute start and optional end of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedTime {
    pub start: Seconds,
    /// `None` for instantaneous cues.
    pub end: Option<Seconds>,
}

/// A placement that could not be positioned in the current scene list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionFailure {
    pub placement_id: DbId,
    pub scene_id: DbId,
    pub reason: String,
}

/// Full result of resolving an episode timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineResolution {
    pub episode_id: DbId,
    /// Revision of the scene sequence this result was computed against.
    pub scene_revision: String,
    pub total_duration_seconds: Seconds,
    /// Sorted by `(track, absolute_start, z_index, placement_id)`.
    pub entries: Vec<ResolvedPlacement>,
    pub failures: Vec<ResolutionFailure>,
    pub conflicts: Vec<PlacementConflict>,
}

/// Resolve an anchor's start time. Returns `None` when a scene anchor points
/// at a scene missing from the index.
pub fn resolve_anchor(anchor: &Anchor, index: &SceneIndex) -> Option<Seconds> {
    match anchor {
        Anchor::Absolute(a) => Some(a.timestamp_seconds),
        Anchor::Scene(a) => {
            let position = index.position(a.scene_id)?;
            Some(position.start + a.attachment_point.base(position.duration) + a.offset_seconds)
        }
    }
}

/// Resolve one placement against a prebuilt index.
pub fn resolve_with_index(
    placement: &Placement,
    index: &SceneIndex,
) -> Result<ResolvedTime, CoreError> {
    let start = resolve_anchor(&placement.anchor, index).ok_or_else(|| CoreError::Resolution {
        placement_id: placement.id,
        scene_id: placement.anchor.scene_id().unwrap_or_default(),
    })?;
    let end = placement.duration.map(|d| start + d);
    // Finite inputs can still sum past f64::MAX.
    if !start.is_finite() || end.is_some_and(|e| !e.is_finite()) {
        return Err(CoreError::validation(format!(
            "Placement {} resolves outside the representable time range",
            placement.id
        )));
    }
    Ok(ResolvedTime { start, end })
}

/// Resolve a single placement in isolation. Still needs the whole scene list,
/// since the cumulative offset depends on every earlier scene.
pub fn resolve_placement(placement: &Placement, scenes: &[Scene]) -> Result<ResolvedTime, CoreError> {
    resolve_with_index(placement, &SceneIndex::build(scenes))
}

/// Resolve every placement of an episode in one pass.
///
/// Builds the scene prefix-sum index once, resolves each placement in O(1),
/// then orders and layers the results. Placements whose anchor scene is gone
/// are reported in `failures`; the rest of the timeline still resolves.
pub fn resolve_timeline(
    episode_id: DbId,
    scenes: &[Scene],
    placements: &[Placement],
) -> TimelineResolution {
    let index = SceneIndex::build(scenes);
    let mut entries = Vec::with_capacity(placements.len());
    let mut failures = Vec::new();

    for placement in placements {
        match resolve_with_index(placement, &index) {
            Ok(time) => entries.push(layering::layer(placement, time)),
            Err(CoreError::Resolution {
                placement_id,
                scene_id,
            }) => {
                tracing::debug!(placement_id, scene_id, "Placement anchor scene missing");
                failures.push(ResolutionFailure {
                    placement_id,
                    scene_id,
                    reason: format!("Scene {scene_id} is not part of episode {episode_id}"),
                });
            }
            Err(other) => failures.push(ResolutionFailure {
                placement_id: placement.id,
                scene_id: placement.anchor.scene_id().unwrap_or_default(),
                reason: other.to_string(),
            }),
        }
    }

    layering::sort_entries(&mut entries);
    failures.sort_by_key(|f| f.placement_id);
    let conflicts = layering::detect_primary_visual_conflicts(&entries);

    TimelineResolution {
        episode_id,
        scene_revision: index.revision().to_string(),
        total_duration_seconds: index.total_duration(),
        entries,
        failures,
        conflicts,
    }
}
