#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use timetable_api::config::ServerConfig;
use timetable_api::router::build_app_router;
use timetable_api::state::AppState;
use timetable_db::store::MemoryStore;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and an in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        generation_timeout_secs: 10,
        scheduler_max_steps: timetable_core::timetable::DEFAULT_MAX_STEPS,
        database_url: None,
        log_json: false,
    }
}

/// Build the full application router over a fresh in-memory store.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) as production.
/// Clone the returned router to send several requests against one store.
pub fn build_test_app() -> Router {
    let config = test_config();
    let state = AppState::new(Arc::new(MemoryStore::new()), config.clone());
    build_app_router(state, &config)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// A save-schedule body from `(day, slot, course, faculty, room)` cells.
pub fn schedule_body(section: &str, cells: &[(&str, &str, &str, &str, &str)]) -> Value {
    let mut grid: Map<String, Value> = Map::new();
    for (day, slot, course, faculty, room) in cells {
        let day_cells = grid
            .entry(day.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        day_cells.as_object_mut().unwrap().insert(
            slot.to_string(),
            json!({ "courseName": course, "facultyName": faculty, "roomName": room }),
        );
    }
    json!({ "sectionName": section, "schedule": grid })
}

/// Save a section and assert it was created.
pub async fn save_section(app: &Router, section: &str, cells: &[(&str, &str, &str, &str, &str)]) {
    let response = post_json(app.clone(), "/api/save_schedule", schedule_body(section, cells)).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
}
