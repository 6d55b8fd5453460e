//! Track & layering assignment for resolved placements.
//!
//! Scenes implicitly own track 1. Within a track placements stack by
//! ascending `z_index`, with the placement id (creation order) as the stable
//! tie-breaker so repeated resolution is reproducible.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::placement::{Placement, PlacementKind, VisualRole};
use crate::resolver::ResolvedTime;
use crate::types::{DbId, Seconds};

/// A placement positioned in absolute episode time on a concrete layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlacement {
    pub placement_id: DbId,
    pub kind: PlacementKind,
    pub visual_role: VisualRole,
    pub absolute_start: Seconds,
    pub absolute_end: Option<Seconds>,
    pub track: i32,
    pub z_index: i32,
    pub label: Option<String>,
}

impl ResolvedPlacement {
    /// Half-open interval `[start, end)`. Instantaneous cues occupy none.
    fn interval(&self) -> Option<(Seconds, Seconds)> {
        match self.absolute_end {
            Some(end) if end > self.absolute_start => Some((self.absolute_start, end)),
            _ => None,
        }
    }
}

/// Two primary-visual placements competing for the same track and time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementConflict {
    pub track: i32,
    /// The placement that starts first (lower id on equal starts).
    pub first_placement_id: DbId,
    pub second_placement_id: DbId,
    pub overlap_start: Seconds,
    pub overlap_end: Seconds,
}

/// Track a placement renders on. Stored tracks below 1 fall back to the
/// kind's default lane.
pub fn assign_track(placement: &Placement) -> i32 {
    if placement.track_number >= 1 {
        placement.track_number
    } else {
        placement.kind.default_track()
    }
}

/// Combine a placement with its resolved time into a layered entry.
pub fn layer(placement: &Placement, time: ResolvedTime) -> ResolvedPlacement {
    ResolvedPlacement {
        placement_id: placement.id,
        kind: placement.kind,
        visual_role: placement.visual_role,
        absolute_start: time.start,
        absolute_end: time.end,
        track: assign_track(placement),
        z_index: placement.z_index,
        label: placement.label.clone(),
    }
}

/// Rendering order: `(track, absolute_start, z_index, placement_id)`.
pub fn render_order(a: &ResolvedPlacement, b: &ResolvedPlacement) -> Ordering {
    a.track
        .cmp(&b.track)
        .then_with(|| a.absolute_start.total_cmp(&b.absolute_start))
        .then_with(|| a.z_index.cmp(&b.z_index))
        .then_with(|| a.placement_id.cmp(&b.placement_id))
}

pub fn sort_entries(entries: &mut [ResolvedPlacement]) {
    entries.sort_by(render_order);
}

/// Report every pair of primary-visual placements whose intervals overlap on
/// the same track. Both members of a pair stay in the resolved output; the
/// caller decides how to settle them.
pub fn detect_primary_visual_conflicts(entries: &[ResolvedPlacement]) -> Vec<PlacementConflict> {
    let mut by_track: BTreeMap<i32, Vec<(&ResolvedPlacement, Seconds, Seconds)>> = BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.visual_role == VisualRole::PrimaryVisual)
    {
        if let Some((start, end)) = entry.interval() {
            by_track.entry(entry.track).or_default().push((entry, start, end));
        }
    }

    let mut conflicts = Vec::new();
    for (track, mut lane) in by_track {
        lane.sort_by(|(a, a_start, _), (b, b_start, _)| {
            a_start
                .total_cmp(b_start)
                .then_with(|| a.placement_id.cmp(&b.placement_id))
        });

        for (i, (first, first_start, first_end)) in lane.iter().enumerate() {
            // Lane is sorted by start, so later entries can only overlap
            // while they begin before `first` ends.
            for (second, second_start, second_end) in lane[i + 1..]
                .iter()
                .take_while(|(_, start, _)| start < first_end)
            {
                conflicts.push(PlacementConflict {
                    track,
                    first_placement_id: first.placement_id,
                    second_placement_id: second.placement_id,
                    overlap_start: first_start.max(*second_start),
                    overlap_end: first_end.min(*second_end),
                });
            }
        }
    }

    conflicts
}
