//! Scene sequence model and the prefix-sum index the resolver runs against.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hashing::sha256_hex;
use crate::types::{DbId, Seconds};

/// One segment of an episode, as supplied by the scene sequence provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: DbId,
    pub episode_id: DbId,
    pub order_index: i32,
    /// `None` for partially-authored scenes; counts as zero.
    pub duration_seconds: Option<Seconds>,
}

impl Scene {
    /// Duration used for timing: missing, negative or non-finite values are 0.
    pub fn effective_duration(&self) -> Seconds {
        match self.duration_seconds {
            Some(d) if d.is_finite() && d >= 0.0 => d,
            Some(d) => {
                tracing::warn!(scene_id = self.id, duration = d, "Ignoring invalid scene duration");
                0.0
            }
            None => 0.0,
        }
    }
}

/// Effective duration of a stored scene row given its optional trim points.
///
/// Trims win when both are present and `trim_end >= trim_start`; otherwise the
/// raw duration is used.
pub fn trimmed_duration(
    duration_seconds: Option<Seconds>,
    trim_start: Option<Seconds>,
    trim_end: Option<Seconds>,
) -> Option<Seconds> {
    match (trim_start, trim_end) {
        (Some(start), Some(end)) if start >= 0.0 && end >= start => Some(end - start),
        _ => duration_seconds,
    }
}

/// Position of a single scene on the assembled episode timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePosition {
    pub order_index: i32,
    /// Sum of durations of every scene ordered strictly before this one.
    pub start: Seconds,
    pub duration: Seconds,
}

/// Prefix-sum index over an episode's scenes, built once per resolution.
#[derive(Debug, Clone)]
pub struct SceneIndex {
    positions: HashMap<DbId, ScenePosition>,
    ordered: Vec<DbId>,
    total_duration: Seconds,
    revision: String,
}

impl SceneIndex {
    /// Build the index. Input order is irrelevant; scenes are sorted by
    /// `(order_index, id)`. Scenes sharing an order index all start at the
    /// cumulative duration of the scenes strictly before that index.
    pub fn build(scenes: &[Scene]) -> Self {
        let mut sorted: Vec<&Scene> = scenes.iter().collect();
        sorted.sort_by_key(|s| (s.order_index, s.id));

        let mut positions = HashMap::with_capacity(sorted.len());
        let mut ordered = Vec::with_capacity(sorted.len());
        let mut fingerprint = String::new();

        let mut running = 0.0;
        let mut group_order: Option<i32> = None;
        let mut group_start = 0.0;

        for scene in &sorted {
            if group_order != Some(scene.order_index) {
                group_order = Some(scene.order_index);
                group_start = running;
            }
            let duration = scene.effective_duration();
            positions.insert(
                scene.id,
                ScenePosition {
                    order_index: scene.order_index,
                    start: group_start,
                    duration,
                },
            );
            ordered.push(scene.id);
            running += duration;
            fingerprint.push_str(&format!("{}:{}:{duration};", scene.id, scene.order_index));
        }

        Self {
            positions,
            ordered,
            total_duration: running,
            revision: sha256_hex(fingerprint.as_bytes()),
        }
    }

    pub fn position(&self, scene_id: DbId) -> Option<&ScenePosition> {
        self.positions.get(&scene_id)
    }

    pub fn contains(&self, scene_id: DbId) -> bool {
        self.positions.contains_key(&scene_id)
    }

    /// Scene ids in timeline order.
    pub fn ordered_ids(&self) -> &[DbId] {
        &self.ordered
    }

    pub fn total_duration(&self) -> Seconds {
        self.total_duration
    }

    /// Digest of the ordered `(id, order, duration)` triples. Any reorder,
    /// retrim, insertion or removal changes it.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
