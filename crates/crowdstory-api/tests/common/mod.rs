//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use crowdstory_core::clock::Clock;
use crowdstory_core::config::GameConfig;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_party::registry::RoomRegistry;
use crowdstory_test_support::{
    FixedClock, RecordingImageGenerator, ScriptedStoryGenerator, SequenceRng, fixed_now,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crowdstory_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(fixed_now()))
}

/// Build the full app router with an in-memory registry, scripted story
/// content and a `SequenceRng` spelling out `codes` for new rooms.
pub fn build_test_app(codes: &[&str]) -> Router {
    build_test_app_with_config(codes, GameConfig::default())
}

/// Same as [`build_test_app`] with custom game settings.
pub fn build_test_app_with_config(codes: &[&str], config: GameConfig) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(SequenceRng::for_codes(codes)));
    let app_state = AppState::new(
        Arc::new(RoomRegistry::new(config)),
        fixed_clock(),
        rng,
        Arc::new(ScriptedStoryGenerator::new()),
        Arc::new(RecordingImageGenerator::default()),
    )
    .with_long_poll_timeout(Duration::from_secs(5));

    crowdstory_api::build_router(app_state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
