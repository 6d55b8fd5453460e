//! Placement data model (assets, wardrobe cues, audio cues on the timeline).
//!
//! The in-memory model carries the anchor as a sum type, so a placement that
//! is both scene-anchored and absolute (or neither) cannot be represented.
//! The flat nullable-column shape only exists at the request and storage
//! boundaries, see [`PlacementInput`] and [`crate::validation`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Seconds, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Track implicitly occupied by the scene video itself.
pub const SCENE_TRACK: i32 = 1;

/// Default track for visual overlays and wardrobe markers.
pub const OVERLAY_TRACK: i32 = 2;

/// Default track for audio cues.
pub const AUDIO_TRACK: i32 = 3;

/// Default stacking order within a track.
pub const DEFAULT_Z_INDEX: i32 = 10;

/// Maximum length of a placement label.
pub const MAX_LABEL_LEN: usize = 255;

/// Maximum length of a wardrobe character name.
pub const MAX_CHARACTER_LEN: usize = 100;

/// Open, extensible effect parameters (opacity, position, transitions, ...).
pub type Properties = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// What kind of external descriptor a placement's `target_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    Asset,
    Wardrobe,
    Audio,
}

impl PlacementKind {
    pub const ALL: [PlacementKind; 3] = [Self::Asset, Self::Wardrobe, Self::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Wardrobe => "wardrobe",
            Self::Audio => "audio",
        }
    }

    /// Track a placement of this kind lands on when none is given.
    pub fn default_track(&self) -> i32 {
        match self {
            Self::Asset | Self::Wardrobe => OVERLAY_TRACK,
            Self::Audio => AUDIO_TRACK,
        }
    }
}

impl FromStr for PlacementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(Self::Asset),
            "wardrobe" => Ok(Self::Wardrobe),
            "audio" => Ok(Self::Audio),
            other => Err(CoreError::validation(format!(
                "Unknown placement kind '{other}'. Valid: [\"asset\", \"wardrobe\", \"audio\"]"
            ))),
        }
    }
}

impl fmt::Display for PlacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where within the anchor scene a scene anchor measures from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentPoint {
    #[default]
    Start,
    End,
    Middle,
    /// No implicit base; the offset carries the whole position.
    Custom,
}

impl AttachmentPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Middle => "middle",
            Self::Custom => "custom",
        }
    }

    /// Base offset into a scene of the given duration.
    pub fn base(&self, scene_duration: Seconds) -> Seconds {
        match self {
            Self::Start | Self::Custom => 0.0,
            Self::End => scene_duration,
            Self::Middle => scene_duration / 2.0,
        }
    }
}

impl FromStr for AttachmentPoint {
    type Err = CoreError;

    /// Accepts the legacy `scene-` prefixed spellings as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" | "scene-start" => Ok(Self::Start),
            "end" | "scene-end" => Ok(Self::End),
            "middle" | "scene-middle" => Ok(Self::Middle),
            "custom" => Ok(Self::Custom),
            other => Err(CoreError::validation(format!(
                "Unknown attachment point '{other}'. Valid: [\"start\", \"end\", \"middle\", \"custom\"]"
            ))),
        }
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a placement replaces the scene video or layers on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualRole {
    PrimaryVisual,
    #[default]
    Overlay,
}

impl VisualRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryVisual => "primary-visual",
            Self::Overlay => "overlay",
        }
    }
}

impl FromStr for VisualRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary-visual" => Ok(Self::PrimaryVisual),
            "overlay" => Ok(Self::Overlay),
            other => Err(CoreError::validation(format!(
                "Unknown visual role '{other}'. Valid: [\"primary-visual\", \"overlay\"]"
            ))),
        }
    }
}

impl fmt::Display for VisualRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// Position tied to a scene; follows the scene when it moves or is retrimmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneAnchor {
    pub scene_id: DbId,
    #[serde(default)]
    pub attachment_point: AttachmentPoint,
    #[serde(default)]
    pub offset_seconds: Seconds,
}

/// Position fixed in episode time; unaffected by scene edits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteAnchor {
    pub timestamp_seconds: Seconds,
}

/// The rule that positions a placement on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anchor {
    Scene(SceneAnchor),
    Absolute(AbsoluteAnchor),
}

impl Anchor {
    pub fn scene(scene_id: DbId, attachment_point: AttachmentPoint, offset_seconds: Seconds) -> Self {
        Self::Scene(SceneAnchor {
            scene_id,
            attachment_point,
            offset_seconds,
        })
    }

    pub fn absolute(timestamp_seconds: Seconds) -> Self {
        Self::Absolute(AbsoluteAnchor { timestamp_seconds })
    }

    pub fn scene_id(&self) -> Option<DbId> {
        match self {
            Self::Scene(a) => Some(a.scene_id),
            Self::Absolute(_) => None,
        }
    }

    pub fn is_scene_anchored(&self) -> bool {
        matches!(self, Self::Scene(_))
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// A stored placement on an episode timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: DbId,
    pub episode_id: DbId,
    pub kind: PlacementKind,
    /// Asset, wardrobe item or audio cue id, depending on `kind`.
    pub target_id: Option<DbId>,
    pub anchor: Anchor,
    pub track_number: i32,
    pub z_index: i32,
    /// `None` for instantaneous cues such as wardrobe changes.
    pub duration: Option<Seconds>,
    pub visual_role: VisualRole,
    pub label: Option<String>,
    /// Character wearing the item (wardrobe cues).
    pub character: Option<String>,
    pub properties: Properties,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A validated placement that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlacement {
    pub episode_id: DbId,
    pub kind: PlacementKind,
    pub target_id: Option<DbId>,
    pub anchor: Anchor,
    pub track_number: i32,
    pub z_index: i32,
    pub duration: Option<Seconds>,
    pub visual_role: VisualRole,
    pub label: Option<String>,
    pub character: Option<String>,
    pub properties: Properties,
}

impl NewPlacement {
    /// Attach storage-assigned identity and timestamps.
    pub fn into_placement(self, id: DbId, now: Timestamp) -> Placement {
        Placement {
            id,
            episode_id: self.episode_id,
            kind: self.kind,
            target_id: self.target_id,
            anchor: self.anchor,
            track_number: self.track_number,
            z_index: self.z_index,
            duration: self.duration,
            visual_role: self.visual_role,
            label: self.label,
            character: self.character,
            properties: self.properties,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary DTOs
// ---------------------------------------------------------------------------

/// Raw placement record as submitted by a client.
///
/// Field names are canonical snake_case; the camelCase spellings used by the
/// editor are accepted as aliases of the same field. Enum values stay strings
/// so unknown members surface as validation errors, not parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementInput {
    #[serde(alias = "placementType", alias = "placement_type")]
    pub kind: Option<String>,
    #[serde(
        alias = "targetId",
        alias = "assetId",
        alias = "asset_id",
        alias = "wardrobeItemId",
        alias = "wardrobe_item_id"
    )]
    pub target_id: Option<DbId>,
    #[serde(alias = "sceneId")]
    pub scene_id: Option<DbId>,
    #[serde(alias = "attachmentPoint")]
    pub attachment_point: Option<String>,
    #[serde(alias = "offsetSeconds")]
    pub offset_seconds: Option<Seconds>,
    #[serde(
        alias = "timestampSeconds",
        alias = "absoluteTimestamp",
        alias = "absolute_timestamp"
    )]
    pub timestamp_seconds: Option<Seconds>,
    #[serde(alias = "trackNumber")]
    pub track_number: Option<i32>,
    #[serde(alias = "zIndex")]
    pub z_index: Option<i32>,
    pub duration: Option<Seconds>,
    #[serde(alias = "visualRole")]
    pub visual_role: Option<String>,
    pub label: Option<String>,
    pub character: Option<String>,
    pub properties: Option<serde_json::Value>,
}

/// Partial update of a placement. Absent fields are left unchanged.
///
/// Setting `scene_id` or `timestamp_seconds` re-anchors the placement;
/// `attachment_point` / `offset_seconds` alone adjust an existing scene anchor.
/// `duration`, `label` and `character` accept an explicit `null` to clear.
/// `kind`, `target_id` and `episode_id` are accepted only so that an attempt
/// to change them is rejected rather than ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementPatch {
    #[serde(alias = "placementType", alias = "placement_type")]
    pub kind: Option<String>,
    #[serde(
        alias = "targetId",
        alias = "assetId",
        alias = "asset_id",
        alias = "wardrobeItemId",
        alias = "wardrobe_item_id"
    )]
    pub target_id: Option<DbId>,
    #[serde(alias = "episodeId")]
    pub episode_id: Option<DbId>,
    #[serde(alias = "sceneId")]
    pub scene_id: Option<DbId>,
    #[serde(alias = "attachmentPoint")]
    pub attachment_point: Option<String>,
    #[serde(alias = "offsetSeconds")]
    pub offset_seconds: Option<Seconds>,
    #[serde(
        alias = "timestampSeconds",
        alias = "absoluteTimestamp",
        alias = "absolute_timestamp"
    )]
    pub timestamp_seconds: Option<Seconds>,
    #[serde(alias = "trackNumber")]
    pub track_number: Option<i32>,
    #[serde(alias = "zIndex")]
    pub z_index: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration: Option<Option<Seconds>>,
    #[serde(alias = "visualRole")]
    pub visual_role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub label: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub character: Option<Option<String>>,
    pub properties: Option<serde_json::Value>,
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
