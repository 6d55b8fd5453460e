//! Structural validation of placement records.
//!
//! Runs on every create and update before anything is persisted. Converts the
//! flat boundary shape into the [`Anchor`] sum type; cross-placement conflicts
//! are the layering module's concern, not checked here.

use crate::error::CoreError;
use crate::placement::{
    Anchor, AttachmentPoint, NewPlacement, Placement, PlacementInput, PlacementKind,
    PlacementPatch, Properties, VisualRole, DEFAULT_Z_INDEX, MAX_CHARACTER_LEN, MAX_LABEL_LEN,
};
use crate::types::{DbId, Seconds};

/// The nullable anchor columns as they appear on the wire or in a table row.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorFields<'a> {
    pub scene_id: Option<DbId>,
    pub attachment_point: Option<&'a str>,
    pub offset_seconds: Option<Seconds>,
    pub timestamp_seconds: Option<Seconds>,
}

/// Build an [`Anchor`] from its flat field representation.
///
/// Exactly one of `scene_id` / `timestamp_seconds` must be set.
/// `attachment_point` and a non-zero `offset_seconds` are only legal on a
/// scene anchor.
pub fn build_anchor(fields: AnchorFields<'_>) -> Result<Anchor, CoreError> {
    match (fields.scene_id, fields.timestamp_seconds) {
        (Some(_), Some(_)) => Err(CoreError::validation(
            "A placement is anchored either to a scene (scene_id) or to an absolute time \
             (timestamp_seconds), not both",
        )),
        (None, None) => Err(CoreError::validation(
            "Either scene_id (scene-anchored) or timestamp_seconds (absolute) is required",
        )),
        (Some(scene_id), None) => {
            let attachment_point = fields
                .attachment_point
                .map(str::parse::<AttachmentPoint>)
                .transpose()?
                .unwrap_or_default();
            let offset_seconds = fields.offset_seconds.unwrap_or(0.0);
            validate_offset(offset_seconds, attachment_point)?;
            Ok(Anchor::scene(scene_id, attachment_point, offset_seconds))
        }
        (None, Some(timestamp_seconds)) => {
            if fields.attachment_point.is_some() {
                return Err(CoreError::validation(
                    "attachment_point only applies to scene-anchored placements",
                ));
            }
            if fields.offset_seconds.is_some_and(|o| o != 0.0) {
                return Err(CoreError::validation(
                    "offset_seconds only applies to scene-anchored placements",
                ));
            }
            validate_non_negative("timestamp_seconds", timestamp_seconds)?;
            Ok(Anchor::absolute(timestamp_seconds))
        }
    }
}

/// Validate a creation request and produce a [`NewPlacement`] with defaults
/// applied (track by kind, z-index 10, overlay role, empty properties).
pub fn validate_new_placement(
    episode_id: DbId,
    input: &PlacementInput,
) -> Result<NewPlacement, CoreError> {
    let kind: PlacementKind = input
        .kind
        .as_deref()
        .ok_or_else(|| CoreError::validation("kind is required (asset, wardrobe, or audio)"))?
        .parse()?;

    if matches!(kind, PlacementKind::Asset | PlacementKind::Wardrobe) && input.target_id.is_none()
    {
        return Err(CoreError::validation(format!(
            "target_id is required for {kind} placements"
        )));
    }

    let anchor = build_anchor(AnchorFields {
        scene_id: input.scene_id,
        attachment_point: input.attachment_point.as_deref(),
        offset_seconds: input.offset_seconds,
        timestamp_seconds: input.timestamp_seconds,
    })?;

    let track_number = input.track_number.unwrap_or_else(|| kind.default_track());
    validate_track_number(track_number)?;

    let z_index = input.z_index.unwrap_or(DEFAULT_Z_INDEX);
    validate_z_index(z_index)?;

    if let Some(duration) = input.duration {
        validate_non_negative("duration", duration)?;
    }
    validate_span(&anchor, input.duration)?;

    let visual_role = input
        .visual_role
        .as_deref()
        .map(str::parse::<VisualRole>)
        .transpose()?
        .unwrap_or_default();

    validate_text("label", input.label.as_deref(), MAX_LABEL_LEN)?;
    validate_text("character", input.character.as_deref(), MAX_CHARACTER_LEN)?;
    let properties = properties_from_value(input.properties.clone())?;

    Ok(NewPlacement {
        episode_id,
        kind,
        target_id: input.target_id,
        anchor,
        track_number,
        z_index,
        duration: input.duration,
        visual_role,
        label: input.label.clone(),
        character: input.character.clone(),
        properties,
    })
}

/// Apply a patch to an existing placement, returning the validated result.
///
/// `kind`, `target_id`, `episode_id` and identity are immutable.
pub fn apply_patch(existing: &Placement, patch: &PlacementPatch) -> Result<Placement, CoreError> {
    validate_immutables(existing, patch)?;

    let mut updated = existing.clone();
    updated.anchor = patched_anchor(&existing.anchor, patch)?;

    if let Some(track_number) = patch.track_number {
        validate_track_number(track_number)?;
        updated.track_number = track_number;
    }
    if let Some(z_index) = patch.z_index {
        validate_z_index(z_index)?;
        updated.z_index = z_index;
    }
    if let Some(duration) = patch.duration {
        if let Some(d) = duration {
            validate_non_negative("duration", d)?;
        }
        updated.duration = duration;
    }
    if let Some(role) = patch.visual_role.as_deref() {
        updated.visual_role = role.parse()?;
    }
    if let Some(label) = &patch.label {
        validate_text("label", label.as_deref(), MAX_LABEL_LEN)?;
        updated.label = label.clone();
    }
    if let Some(character) = &patch.character {
        validate_text("character", character.as_deref(), MAX_CHARACTER_LEN)?;
        updated.character = character.clone();
    }
    if let Some(properties) = &patch.properties {
        updated.properties = properties_from_value(Some(properties.clone()))?;
    }
    validate_span(&updated.anchor, updated.duration)?;

    Ok(updated)
}

fn validate_immutables(existing: &Placement, patch: &PlacementPatch) -> Result<(), CoreError> {
    if let Some(kind) = patch.kind.as_deref() {
        let kind: PlacementKind = kind.parse()?;
        if kind != existing.kind {
            return Err(CoreError::validation(format!(
                "kind cannot change from {} to {kind}; create a new placement instead",
                existing.kind
            )));
        }
    }
    if patch.target_id.is_some_and(|t| existing.target_id != Some(t)) {
        return Err(CoreError::validation(
            "target_id cannot change; create a new placement instead",
        ));
    }
    if patch.episode_id.is_some_and(|e| e != existing.episode_id) {
        return Err(CoreError::validation(
            "A placement cannot move to another episode",
        ));
    }
    Ok(())
}

/// The end of an absolute placement must stay representable.
fn validate_span(anchor: &Anchor, duration: Option<Seconds>) -> Result<(), CoreError> {
    if let (Anchor::Absolute(a), Some(d)) = (anchor, duration) {
        if !(a.timestamp_seconds + d).is_finite() {
            return Err(CoreError::validation(
                "timestamp_seconds + duration exceeds the representable time range",
            ));
        }
    }
    Ok(())
}

fn patched_anchor(current: &Anchor, patch: &PlacementPatch) -> Result<Anchor, CoreError> {
    let adjusts_scene_fields = patch.attachment_point.is_some() || patch.offset_seconds.is_some();

    match (patch.scene_id, patch.timestamp_seconds, current) {
        // Re-anchor to a new (or the same) scene, inheriting attachment and
        // offset from the current scene anchor when not given.
        (Some(scene_id), None, _) => {
            let (inherited_point, inherited_offset) = match current {
                Anchor::Scene(a) => (a.attachment_point.as_str(), a.offset_seconds),
                Anchor::Absolute(_) => (AttachmentPoint::Start.as_str(), 0.0),
            };
            build_anchor(AnchorFields {
                scene_id: Some(scene_id),
                attachment_point: Some(patch.attachment_point.as_deref().unwrap_or(inherited_point)),
                offset_seconds: Some(patch.offset_seconds.unwrap_or(inherited_offset)),
                timestamp_seconds: None,
            })
        }
        (scene_id, Some(timestamp_seconds), _) => build_anchor(AnchorFields {
            scene_id,
            attachment_point: patch.attachment_point.as_deref(),
            offset_seconds: patch.offset_seconds,
            timestamp_seconds: Some(timestamp_seconds),
        }),
        (None, None, Anchor::Scene(a)) if adjusts_scene_fields => build_anchor(AnchorFields {
            scene_id: Some(a.scene_id),
            attachment_point: Some(
                patch
                    .attachment_point
                    .as_deref()
                    .unwrap_or(a.attachment_point.as_str()),
            ),
            offset_seconds: Some(patch.offset_seconds.unwrap_or(a.offset_seconds)),
            timestamp_seconds: None,
        }),
        (None, None, Anchor::Absolute(_)) if adjusts_scene_fields => Err(CoreError::validation(
            "attachment_point and offset_seconds only apply to scene-anchored placements",
        )),
        (None, None, _) => Ok(*current),
    }
}

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

/// Reject negative or non-finite seconds.
pub fn validate_non_negative(field: &str, value: Seconds) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::validation(format!(
            "{field} must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(CoreError::validation(format!(
            "{field} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

/// Offsets are non-negative except on `custom` attachments, which have no
/// implicit base and may be signed.
pub fn validate_offset(offset: Seconds, attachment_point: AttachmentPoint) -> Result<(), CoreError> {
    match attachment_point {
        AttachmentPoint::Custom if offset.is_finite() => Ok(()),
        AttachmentPoint::Custom => Err(CoreError::validation(
            "offset_seconds must be a finite number",
        )),
        _ => validate_non_negative("offset_seconds", offset),
    }
}

pub fn validate_track_number(track_number: i32) -> Result<(), CoreError> {
    if track_number < 1 {
        return Err(CoreError::validation(format!(
            "track_number must be >= 1, got {track_number}"
        )));
    }
    Ok(())
}

pub fn validate_z_index(z_index: i32) -> Result<(), CoreError> {
    if z_index < 0 {
        return Err(CoreError::validation(format!(
            "z_index must be >= 0, got {z_index}"
        )));
    }
    Ok(())
}

fn validate_text(field: &str, value: Option<&str>, max_len: usize) -> Result<(), CoreError> {
    if let Some(v) = value {
        let len = v.chars().count();
        if len > max_len {
            return Err(CoreError::validation(format!(
                "{field} must be at most {max_len} characters, got {len}"
            )));
        }
    }
    Ok(())
}

fn properties_from_value(value: Option<serde_json::Value>) -> Result<Properties, CoreError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(Properties::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(_) => Err(CoreError::validation("properties must be a JSON object")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
