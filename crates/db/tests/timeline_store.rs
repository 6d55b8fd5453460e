//! Integration tests for the Postgres timeline store.
//!
//! Require a reachable PostgreSQL instance via `DATABASE_URL`; run with
//! `cargo test -p cutline-db -- --ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use cutline_core::error::CoreError;
use cutline_core::orphan::OrphanPolicy;
use cutline_core::placement::{
    Anchor, AttachmentPoint, NewPlacement, PlacementInput, PlacementKind, Properties, VisualRole,
};
use cutline_core::scene::SceneIndex;
use cutline_core::service::TimelineService;
use cutline_core::store::{PlacementStore, SceneSequenceProvider, WritePrecondition};
use cutline_db::PgTimelineStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_episode(pool: &PgPool) -> (i64, Vec<i64>) {
    let (episode_id,): (i64,) =
        sqlx::query_as("INSERT INTO episodes (title) VALUES ('Pilot') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();

    let mut scene_ids = Vec::new();
    for (order, duration) in [(1, 10.0), (2, 20.0), (3, 15.0)] {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO episode_scenes (episode_id, scene_order, duration_seconds) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(episode_id)
        .bind(order)
        .bind(duration)
        .fetch_one(pool)
        .await
        .unwrap();
        scene_ids.push(id);
    }
    (episode_id, scene_ids)
}

fn input(value: serde_json::Value) -> PlacementInput {
    serde_json::from_value(value).unwrap()
}

fn audio_cue(episode_id: i64, anchor: Anchor, z_index: i32) -> NewPlacement {
    NewPlacement {
        episode_id,
        kind: PlacementKind::Audio,
        target_id: None,
        anchor,
        track_number: 3,
        z_index,
        duration: None,
        visual_role: VisualRole::Overlay,
        label: None,
        character: None,
        properties: Properties::new(),
    }
}

async fn placement_count(pool: &PgPool, episode_id: i64) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM timeline_placements WHERE episode_id = $1")
            .bind(episode_id)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

fn service(pool: PgPool) -> TimelineService {
    TimelineService::new(Arc::new(PgTimelineStore::new(pool)), OrphanPolicy::Orphan)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn resolves_persisted_timeline(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let svc = service(pool.clone());

    let a = svc
        .create_placement(
            episode_id,
            &input(serde_json::json!({
                "kind": "asset", "target_id": 1, "scene_id": scenes[1], "offset_seconds": 2.0
            })),
            None,
        )
        .await
        .unwrap();
    let c = svc
        .create_placement(
            episode_id,
            &input(serde_json::json!({ "kind": "audio", "timestamp_seconds": 5.0 })),
            None,
        )
        .await
        .unwrap();

    let timeline = svc.resolve_timeline(episode_id).await.unwrap();
    assert_eq!(timeline.total_duration_seconds, 45.0);
    let start = |id| {
        timeline
            .entries
            .iter()
            .find(|e| e.placement_id == id)
            .map(|e| e.absolute_start)
    };
    assert_eq!(start(a.id), Some(12.0));
    assert_eq!(start(c.id), Some(5.0));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn trims_shorten_effective_duration(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    sqlx::query("UPDATE episode_scenes SET trim_start = 1, trim_end = 9 WHERE id = $1")
        .bind(scenes[0])
        .execute(&pool)
        .await
        .unwrap();

    let store = PgTimelineStore::new(pool);
    let listed = store.list_scenes(episode_id).await.unwrap();
    assert_eq!(listed[0].duration_seconds, Some(8.0));
    assert!(store.episode_exists(episode_id).await.unwrap());
    assert!(!store.episode_exists(episode_id + 1000).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn update_reanchors_and_clears_previous_columns(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let svc = service(pool.clone());

    let created = svc
        .create_placement(
            episode_id,
            &input(serde_json::json!({ "kind": "audio", "timestamp_seconds": 3.0 })),
            None,
        )
        .await
        .unwrap();
    let patch = serde_json::from_value(serde_json::json!({
        "scene_id": scenes[2], "attachment_point": "end"
    }))
    .unwrap();
    let updated = svc
        .update_placement(episode_id, created.id, &patch, None)
        .await
        .unwrap();
    assert_eq!(updated.anchor, Anchor::scene(scenes[2], AttachmentPoint::End, 0.0));

    let (ts,): (Option<f64>,) =
        sqlx::query_as("SELECT timestamp_seconds FROM timeline_placements WHERE id = $1")
            .bind(created.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(ts, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn database_rejects_both_anchors(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let result = sqlx::query(
        "INSERT INTO timeline_placements \
            (episode_id, placement_type, scene_id, timestamp_seconds, track_number) \
         VALUES ($1, 'audio', $2, 1.0, 3)",
    )
    .bind(episode_id)
    .bind(scenes[0])
    .execute(&pool)
    .await;
    assert_matches!(result, Err(sqlx::Error::Database(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn scene_removal_cascades_in_one_transaction(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let svc = service(pool.clone());

    let doomed = svc
        .create_placement(
            episode_id,
            &input(serde_json::json!({ "kind": "audio", "scene_id": scenes[0] })),
            None,
        )
        .await
        .unwrap();

    svc.remove_scene(episode_id, scenes[0], Some(OrphanPolicy::Cascade), None)
        .await
        .unwrap();

    let store = PgTimelineStore::new(pool);
    assert!(store.find_placement(episode_id, doomed.id).await.unwrap().is_none());
    assert_eq!(store.list_scenes(episode_id).await.unwrap().len(), 2);
    assert_matches!(
        svc.remove_scene(episode_id, scenes[0], None, None).await,
        Err(CoreError::NotFound { entity: "Scene", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn check_violation_surfaces_as_validation(pool: PgPool) {
    let (episode_id, _) = seed_episode(&pool).await;
    let store = PgTimelineStore::new(pool.clone());

    let result = store
        .insert_placement(
            &audio_cue(episode_id, Anchor::absolute(1.0), -1),
            &WritePrecondition::default(),
        )
        .await;
    assert_matches!(
        result,
        Err(CoreError::Validation(msg)) if msg.contains("ck_timeline_placements_z_index")
    );
    assert_eq!(placement_count(&pool, episode_id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn write_rechecks_scene_revision_in_transaction(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let store = PgTimelineStore::new(pool.clone());
    let revision = SceneIndex::build(&store.list_scenes(episode_id).await.unwrap())
        .revision()
        .to_string();

    // The editor retrims the first scene after the writer read the revision.
    sqlx::query("UPDATE episode_scenes SET duration_seconds = 8 WHERE id = $1")
        .bind(scenes[0])
        .execute(&pool)
        .await
        .unwrap();

    let precondition = WritePrecondition {
        scene_revision: Some(revision),
        anchor_scene: Some(scenes[1]),
    };
    let cue = audio_cue(
        episode_id,
        Anchor::scene(scenes[1], AttachmentPoint::Start, 0.0),
        10,
    );
    assert_matches!(
        store.insert_placement(&cue, &precondition).await,
        Err(CoreError::Conflict(_))
    );
    assert_eq!(placement_count(&pool, episode_id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn write_rejects_anchor_scene_deleted_after_read(pool: PgPool) {
    let (episode_id, scenes) = seed_episode(&pool).await;
    let store = PgTimelineStore::new(pool.clone());

    sqlx::query("DELETE FROM episode_scenes WHERE id = $1")
        .bind(scenes[1])
        .execute(&pool)
        .await
        .unwrap();

    let precondition = WritePrecondition {
        scene_revision: None,
        anchor_scene: Some(scenes[1]),
    };
    let cue = audio_cue(
        episode_id,
        Anchor::scene(scenes[1], AttachmentPoint::Start, 0.0),
        10,
    );
    assert_matches!(
        store.insert_placement(&cue, &precondition).await,
        Err(CoreError::NotFound { entity: "Scene", .. })
    );
    assert_eq!(placement_count(&pool, episode_id).await, 0);
}
