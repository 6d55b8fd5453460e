//! Current-wardrobe lookup: which outfit a character wears at a given scene.

use crate::error::CoreError;
use crate::placement::{Placement, PlacementKind};
use crate::resolver::resolve_anchor;
use crate::scene::{Scene, SceneIndex};
use crate::types::DbId;

/// Scene a wardrobe lookup is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneRef {
    Id(DbId),
    Order(i32),
}

/// Find the wardrobe cue in effect for `character` at `at`.
///
/// Only scene-anchored wardrobe placements count. The winner is the one whose
/// anchor scene comes last among scenes ordered at or before the target,
/// then the latest resolved time within that scene, then the newest placement.
pub fn current_wardrobe<'a>(
    character: &str,
    at: SceneRef,
    scenes: &[Scene],
    placements: &'a [Placement],
) -> Result<Option<&'a Placement>, CoreError> {
    let index = SceneIndex::build(scenes);
    let target_order = match at {
        SceneRef::Order(order) => order,
        SceneRef::Id(scene_id) => {
            index
                .position(scene_id)
                .ok_or(CoreError::NotFound {
                    entity: "Scene",
                    id: scene_id,
                })?
                .order_index
        }
    };

    let winner = placements
        .iter()
        .filter(|p| p.kind == PlacementKind::Wardrobe)
        .filter(|p| p.character.as_deref() == Some(character))
        .filter_map(|p| {
            let position = index.position(p.anchor.scene_id()?)?;
            if position.order_index > target_order {
                return None;
            }
            let time = resolve_anchor(&p.anchor, &index)?;
            Some((position.order_index, time, p))
        })
        .max_by(|(a_order, a_time, a), (b_order, b_time, b)| {
            a_order
                .cmp(b_order)
                .then_with(|| a_time.total_cmp(b_time))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|(_, _, p)| p);

    Ok(winner)
}
