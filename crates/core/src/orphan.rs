//! What happens to scene-anchored placements when their scene is deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::placement::{Anchor, AttachmentPoint, Placement};
use crate::resolver::resolve_anchor;
use crate::scene::{Scene, SceneIndex};
use crate::types::{DbId, Seconds};

/// Policy for placements whose anchor scene is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave the placement as-is; it reports a resolution failure until it is
    /// re-anchored.
    #[default]
    Orphan,
    /// Delete placements together with their scene.
    Cascade,
    /// Re-anchor to a surviving neighbour, preserving absolute time.
    Reattach,
}

impl FromStr for OrphanPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orphan" => Ok(Self::Orphan),
            "cascade" => Ok(Self::Cascade),
            "reattach" => Ok(Self::Reattach),
            other => Err(CoreError::validation(format!(
                "Unknown orphan policy '{other}'. Valid: [\"orphan\", \"cascade\", \"reattach\"]"
            ))),
        }
    }
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Orphan => "orphan",
            Self::Cascade => "cascade",
            Self::Reattach => "reattach",
        })
    }
}

/// Planned change for a single affected placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrphanAction {
    Keep { placement_id: DbId },
    Delete { placement_id: DbId },
    Reanchor { placement_id: DbId, anchor: Anchor },
}

/// Plan how placements anchored to `removed_scene_id` are handled.
///
/// `scenes` is the sequence *before* removal. Only placements anchored to the
/// removed scene appear in the result.
///
/// Under [`OrphanPolicy::Reattach`] a placement moves to the next surviving
/// scene's start, else the previous surviving scene's end, keeping its
/// resolved time. When no scene survives it becomes absolute at that time.
pub fn plan_scene_removal(
    removed_scene_id: DbId,
    scenes: &[Scene],
    placements: &[Placement],
    policy: OrphanPolicy,
) -> Vec<OrphanAction> {
    let affected = placements
        .iter()
        .filter(|p| p.anchor.scene_id() == Some(removed_scene_id));

    match policy {
        OrphanPolicy::Orphan => affected
            .map(|p| OrphanAction::Keep { placement_id: p.id })
            .collect(),
        OrphanPolicy::Cascade => affected
            .map(|p| OrphanAction::Delete { placement_id: p.id })
            .collect(),
        OrphanPolicy::Reattach => {
            let before = SceneIndex::build(scenes);
            let Some(removed) = scenes.iter().find(|s| s.id == removed_scene_id) else {
                return affected
                    .map(|p| OrphanAction::Keep { placement_id: p.id })
                    .collect();
            };
            let removed_key = (removed.order_index, removed.id);
            let survivors: Vec<Scene> = scenes
                .iter()
                .filter(|s| s.id != removed_scene_id)
                .cloned()
                .collect();
            let after = SceneIndex::build(&survivors);

            let next = survivors
                .iter()
                .filter(|s| (s.order_index, s.id) > removed_key)
                .min_by_key(|s| (s.order_index, s.id));
            let previous = survivors
                .iter()
                .filter(|s| (s.order_index, s.id) < removed_key)
                .max_by_key(|s| (s.order_index, s.id));

            affected
                .map(|p| {
                    let time = resolve_anchor(&p.anchor, &before).unwrap_or(0.0);
                    let anchor = match (next, previous) {
                        (Some(scene), _) => {
                            anchor_at(scene.id, AttachmentPoint::Start, time, &after)
                        }
                        (None, Some(scene)) => {
                            anchor_at(scene.id, AttachmentPoint::End, time, &after)
                        }
                        (None, None) => Anchor::absolute(time.max(0.0)),
                    };
                    OrphanAction::Reanchor {
                        placement_id: p.id,
                        anchor,
                    }
                })
                .collect()
        }
    }
}

/// Anchor to `scene_id` so that it resolves to `time` in `index`. Falls back
/// to a signed `custom` offset when `time` precedes the preferred point.
fn anchor_at(scene_id: DbId, point: AttachmentPoint, time: Seconds, index: &SceneIndex) -> Anchor {
    let Some(position) = index.position(scene_id) else {
        return Anchor::absolute(time.max(0.0));
    };
    let offset = time - position.start - point.base(position.duration);
    if offset >= 0.0 {
        Anchor::scene(scene_id, point, offset)
    } else {
        Anchor::scene(scene_id, AttachmentPoint::Custom, time - position.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{NewPlacement, PlacementKind, Properties, VisualRole};
    use crate::resolver::resolve_placement;

    fn scene(id: DbId, order: i32, duration: f64) -> Scene {
        Scene {
            id,
            episode_id: 1,
            order_index: order,
            duration_seconds: Some(duration),
        }
    }

    fn placement(id: DbId, anchor: Anchor) -> Placement {
        NewPlacement {
            episode_id: 1,
            kind: PlacementKind::Audio,
            target_id: None,
            anchor,
            track_number: 3,
            z_index: 10,
            duration: None,
            visual_role: VisualRole::Overlay,
            label: None,
            character: None,
            properties: Properties::new(),
        }
        .into_placement(id, chrono::Utc::now())
    }

    fn scenes() -> Vec<Scene> {
        vec![scene(1, 1, 10.0), scene(2, 2, 20.0), scene(3, 3, 15.0)]
    }

    #[test]
    fn policy_parses_and_defaults_to_orphan() {
        assert_eq!(OrphanPolicy::default(), OrphanPolicy::Orphan);
        assert_eq!("cascade".parse::<OrphanPolicy>().unwrap(), OrphanPolicy::Cascade);
        assert!("nearest".parse::<OrphanPolicy>().is_err());
    }

    #[test]
    fn only_placements_on_removed_scene_are_affected() {
        let placements = vec![
            placement(1, Anchor::scene(2, AttachmentPoint::Start, 0.0)),
            placement(2, Anchor::scene(3, AttachmentPoint::Start, 0.0)),
            placement(3, Anchor::absolute(4.0)),
        ];
        let keep = plan_scene_removal(2, &scenes(), &placements, OrphanPolicy::Orphan);
        assert_eq!(keep, vec![OrphanAction::Keep { placement_id: 1 }]);

        let delete = plan_scene_removal(2, &scenes(), &placements, OrphanPolicy::Cascade);
        assert_eq!(delete, vec![OrphanAction::Delete { placement_id: 1 }]);
    }

    #[test]
    fn reattach_moves_to_next_scene_preserving_time() {
        let p = placement(1, Anchor::scene(2, AttachmentPoint::Middle, 1.0)); // t = 21
        let actions = plan_scene_removal(2, &scenes(), &[p], OrphanPolicy::Reattach);
        let OrphanAction::Reanchor { anchor, .. } = actions[0] else {
            panic!("expected reanchor, got {actions:?}");
        };
        // After removal S3 starts at 10; 21 lies 11s past its start.
        assert_eq!(anchor, Anchor::scene(3, AttachmentPoint::Start, 11.0));
    }

    #[test]
    fn reattach_last_scene_goes_to_previous_end() {
        let p = placement(1, Anchor::scene(3, AttachmentPoint::Start, 2.0)); // t = 32
        let actions = plan_scene_removal(3, &scenes(), &[p], OrphanPolicy::Reattach);
        let OrphanAction::Reanchor { anchor, .. } = actions[0] else {
            panic!("expected reanchor");
        };
        assert_eq!(anchor, Anchor::scene(2, AttachmentPoint::End, 2.0));

        let moved = placement(2, anchor);
        let survivors = vec![scene(1, 1, 10.0), scene(2, 2, 20.0)];
        assert_eq!(resolve_placement(&moved, &survivors).unwrap().start, 32.0);
    }

    #[test]
    fn reattach_uses_custom_when_time_precedes_anchor_point() {
        // S2 start at 10, negative custom offset puts the cue before S2.
        let p = placement(1, Anchor::scene(2, AttachmentPoint::Custom, -4.0)); // t = 6
        let actions = plan_scene_removal(2, &scenes(), &[p], OrphanPolicy::Reattach);
        let OrphanAction::Reanchor { anchor, .. } = actions[0] else {
            panic!("expected reanchor");
        };
        assert_eq!(anchor, Anchor::scene(3, AttachmentPoint::Custom, -4.0));
    }

    #[test]
    fn reattach_without_survivors_becomes_absolute() {
        let only = vec![scene(1, 1, 10.0)];
        let p = placement(1, Anchor::scene(1, AttachmentPoint::End, 0.0));
        let actions = plan_scene_removal(1, &only, &[p], OrphanPolicy::Reattach);
        assert_eq!(
            actions,
            vec![OrphanAction::Reanchor {
                placement_id: 1,
                anchor: Anchor::absolute(10.0),
            }]
        );
    }
}
