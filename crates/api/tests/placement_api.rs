//! HTTP-level tests for the placement CRUD endpoints.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router
//! without an actual TCP listener.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, patch_json, placements_uri, post_json, seeded_store};
use serde_json::json;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_scene_anchored_placement_returns_201() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        &placements_uri(),
        json!({ "kind": "asset", "target_id": 7, "scene_id": 2, "offset_seconds": 2.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    assert!(data["id"].is_number());
    assert_eq!(data["kind"], "asset");
    assert_eq!(data["anchor"]["type"], "scene");
    assert_eq!(data["anchor"]["attachment_point"], "start");
    assert_eq!(data["track_number"], 2);
    assert_eq!(data["z_index"], 10);
    assert_eq!(data["visual_role"], "overlay");
}

#[tokio::test]
async fn create_accepts_camel_case_body() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        &placements_uri(),
        json!({
            "placementType": "wardrobe",
            "wardrobeItemId": 12,
            "sceneId": 1,
            "attachmentPoint": "scene-end",
            "character": "Lala"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["kind"], "wardrobe");
    assert_eq!(json["data"]["target_id"], 12);
    assert_eq!(json["data"]["anchor"]["attachment_point"], "end");
    assert_eq!(json["data"]["character"], "Lala");
}

#[tokio::test]
async fn create_with_both_anchors_returns_400() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        &placements_uri(),
        json!({ "kind": "audio", "scene_id": 1, "timestamp_seconds": 4.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_with_unknown_scene_returns_404() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        &placements_uri(),
        json!({ "kind": "audio", "scene_id": 99 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Scene with id 99 not found");
}

#[tokio::test]
async fn create_for_unknown_episode_returns_404() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        "/api/v1/episodes/77/timeline/placements",
        json!({ "kind": "audio", "timestamp_seconds": 1.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_scene_revision_returns_409() {
    let store = seeded_store().await;
    let response = post_json(
        build_test_app(store),
        &format!("{}?expected_scene_revision=deadbeef", placements_uri()),
        json!({ "kind": "audio", "timestamp_seconds": 1.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Read / list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_and_list_placements() {
    let store = seeded_store().await;
    for body in [
        json!({ "kind": "audio", "timestamp_seconds": 1.0 }),
        json!({ "kind": "asset", "target_id": 1, "scene_id": 3 }),
    ] {
        let response = post_json(build_test_app(store.clone()), &placements_uri(), body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = get(build_test_app(store.clone()), &format!("{}/1", placements_uri())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["kind"], "audio");

    let response = get(build_test_app(store.clone()), &placements_uri()).await;
    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    // Track 2 (asset) before track 3 (audio).
    assert_eq!(ids, vec![2, 1]);

    let response = get(
        build_test_app(store),
        &format!("{}?kind=audio", placements_uri()),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_with_unknown_kind_returns_400() {
    let store = seeded_store().await;
    let response = get(
        build_test_app(store),
        &format!("{}?kind=video", placements_uri()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_reanchors_to_absolute() {
    let store = seeded_store().await;
    post_json(
        build_test_app(store.clone()),
        &placements_uri(),
        json!({ "kind": "asset", "target_id": 3, "scene_id": 2, "label": "Logo" }),
    )
    .await;

    let response = patch_json(
        build_test_app(store.clone()),
        &format!("{}/1", placements_uri()),
        json!({ "timestamp_seconds": 7.5, "label": null }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["anchor"]["type"], "absolute");
    assert_eq!(json["data"]["anchor"]["timestamp_seconds"], 7.5);
    assert!(json["data"]["label"].is_null());
}

#[tokio::test]
async fn patch_changing_kind_or_target_returns_400() {
    let store = seeded_store().await;
    post_json(
        build_test_app(store.clone()),
        &placements_uri(),
        json!({ "kind": "asset", "target_id": 1, "scene_id": 1 }),
    )
    .await;

    for body in [
        json!({ "kind": "video", "target_id": 99 }),
        json!({ "target_id": 99 }),
    ] {
        let response = patch_json(
            build_test_app(store.clone()),
            &format!("{}/1", placements_uri()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    let response = get(build_test_app(store), &format!("{}/1", placements_uri())).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["kind"], "asset");
    assert_eq!(json["data"]["target_id"], 1);
}

#[tokio::test]
async fn patch_unknown_placement_returns_404() {
    let store = seeded_store().await;
    let response = patch_json(
        build_test_app(store),
        &format!("{}/42", placements_uri()),
        json!({ "z_index": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let store = seeded_store().await;
    post_json(
        build_test_app(store.clone()),
        &placements_uri(),
        json!({ "kind": "audio", "timestamp_seconds": 2.0 }),
    )
    .await;

    let uri = format!("{}/1", placements_uri());
    let response = delete(build_test_app(store.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(build_test_app(store), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
