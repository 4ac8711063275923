//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app(&[]);

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["rooms"], 0);
}

#[tokio::test]
async fn test_health_counts_live_rooms() {
    let app = common::build_test_app(&["ABC123"]);
    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/rooms",
        &json!({ "display_name": "Host" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = common::get_json(app, "/health").await;

    assert_eq!(json["rooms"], 1);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(&[]);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
