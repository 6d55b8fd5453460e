//! Placement rows from `timeline_placements`.
//!
//! The table stores the anchor as nullable column pairs; conversion into
//! [`Placement`] goes through the same validating constructor as API input,
//! so a row that somehow carries both or neither anchor is reported instead
//! of resolved.

use cutline_core::error::CoreError;
use cutline_core::placement::{Anchor, Placement, Properties};
use cutline_core::types::{DbId, Seconds, Timestamp};
use cutline_core::validation::{build_anchor, AnchorFields};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `timeline_placements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlacementRow {
    pub id: DbId,
    pub episode_id: DbId,
    pub placement_type: String,
    pub target_id: Option<DbId>,
    pub scene_id: Option<DbId>,
    pub attachment_point: Option<String>,
    pub offset_seconds: Option<Seconds>,
    pub timestamp_seconds: Option<Seconds>,
    pub track_number: i32,
    pub z_index: i32,
    pub duration: Option<Seconds>,
    pub visual_role: String,
    pub label: Option<String>,
    pub character: Option<String>,
    pub properties: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<PlacementRow> for Placement {
    type Error = CoreError;

    fn try_from(row: PlacementRow) -> Result<Self, Self::Error> {
        let anchor = build_anchor(AnchorFields {
            scene_id: row.scene_id,
            attachment_point: row.attachment_point.as_deref(),
            offset_seconds: row.offset_seconds,
            timestamp_seconds: row.timestamp_seconds,
        })
        .map_err(|e| CoreError::Internal(format!("placement {} has a corrupt anchor: {e}", row.id)))?;

        let properties = match row.properties {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Properties::new(),
            _ => {
                return Err(CoreError::Internal(format!(
                    "placement {} has non-object properties",
                    row.id
                )))
            }
        };

        Ok(Placement {
            id: row.id,
            episode_id: row.episode_id,
            kind: row.placement_type.parse()?,
            target_id: row.target_id,
            anchor,
            track_number: row.track_number,
            z_index: row.z_index,
            duration: row.duration,
            visual_role: row.visual_role.parse()?,
            label: row.label,
            character: row.character,
            properties,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Anchor split back into its `(scene_id, attachment_point, offset_seconds,
/// timestamp_seconds)` columns.
pub struct AnchorColumns {
    pub scene_id: Option<DbId>,
    pub attachment_point: Option<&'static str>,
    pub offset_seconds: Option<Seconds>,
    pub timestamp_seconds: Option<Seconds>,
}

impl From<&Anchor> for AnchorColumns {
    fn from(anchor: &Anchor) -> Self {
        match anchor {
            Anchor::Scene(a) => AnchorColumns {
                scene_id: Some(a.scene_id),
                attachment_point: Some(a.attachment_point.as_str()),
                offset_seconds: Some(a.offset_seconds),
                timestamp_seconds: None,
            },
            Anchor::Absolute(a) => AnchorColumns {
                scene_id: None,
                attachment_point: None,
                offset_seconds: None,
                timestamp_seconds: Some(a.timestamp_seconds),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use cutline_core::placement::{AttachmentPoint, PlacementKind, VisualRole};

    use super::*;

    fn row() -> PlacementRow {
        PlacementRow {
            id: 11,
            episode_id: 1,
            placement_type: "wardrobe".into(),
            target_id: Some(77),
            scene_id: Some(2),
            attachment_point: Some("end".into()),
            offset_seconds: Some(1.5),
            timestamp_seconds: None,
            track_number: 2,
            z_index: 10,
            duration: None,
            visual_role: "overlay".into(),
            label: None,
            character: Some("Lala".into()),
            properties: serde_json::json!({ "opacity": 0.8 }),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn scene_row_converts() {
        let placement = Placement::try_from(row()).unwrap();
        assert_eq!(placement.kind, PlacementKind::Wardrobe);
        assert_eq!(placement.anchor, Anchor::scene(2, AttachmentPoint::End, 1.5));
        assert_eq!(placement.visual_role, VisualRole::Overlay);
        assert_eq!(placement.properties["opacity"], 0.8);
    }

    #[test]
    fn row_with_both_anchors_is_internal_error() {
        let mut bad = row();
        bad.timestamp_seconds = Some(3.0);
        assert_matches!(Placement::try_from(bad), Err(CoreError::Internal(msg)) if msg.contains("11"));
    }

    #[test]
    fn anchor_columns_split() {
        let cols = AnchorColumns::from(&Anchor::absolute(4.0));
        assert_eq!(cols.scene_id, None);
        assert_eq!(cols.attachment_point, None);
        assert_eq!(cols.timestamp_seconds, Some(4.0));

        let cols = AnchorColumns::from(&Anchor::scene(5, AttachmentPoint::Middle, 0.0));
        assert_eq!(cols.scene_id, Some(5));
        assert_eq!(cols.attachment_point, Some("middle"));
        assert_eq!(cols.offset_seconds, Some(0.0));
    }
}
