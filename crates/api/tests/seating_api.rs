//! HTTP-level tests for exam-seating allocation.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json};
use serde_json::{json, Value};

fn students(branch: &str, count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| json!({ "roll_no": format!("{branch}{i:02}"), "name": format!("{branch} {i}"), "branch": branch }))
        .collect()
}

#[tokio::test]
async fn interleaves_two_branches_in_one_room() {
    let app = common::build_test_app();
    let mut all = students("CS", 10);
    all.extend(students("EC", 10));

    let response = post_json(
        app,
        "/api/generate_exam_seating",
        json!({ "students": all, "rooms": [{ "name": "Hall A", "rows": 4, "cols": 5 }] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let assignments = json["assignments"].as_array().unwrap();
    assert_eq!(assignments.len(), 20);
    assert_eq!(json["unplaced"], json!([]));
    assert_eq!(json["adjacent_conflicts"], 0);

    let first = &assignments[0];
    assert_eq!(first["room_name"], "Hall A");
    assert_eq!(first["row"], 1);
    assert_eq!(first["col"], 1);
    assert!(first["student"]["roll_no"].is_string());
}

#[tokio::test]
async fn uneven_three_branch_mix_fills_room_without_neighbours() {
    let app = common::build_test_app();
    let mut all = students("CS", 2);
    all.extend(students("EC", 1));
    all.extend(students("ME", 3));

    let response = post_json(
        app,
        "/api/generate_exam_seating",
        json!({ "students": all, "rooms": [{ "name": "Lab", "rows": 2, "cols": 3 }] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["assignments"].as_array().unwrap().len(), 6);
    assert_eq!(json["unplaced"], json!([]));
    assert_eq!(json["adjacent_conflicts"], 0);
}

#[tokio::test]
async fn overflow_is_reported_as_unplaced() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/api/generate_exam_seating",
        json!({
            "students": students("CS", 3),
            "rooms": [{ "name": "Tiny", "rows": 1, "cols": 2 }],
            "adjacency": "diagonal"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let seated = json["assignments"].as_array().unwrap().len();
    let unplaced = json["unplaced"].as_array().unwrap().len();
    assert_eq!(seated + unplaced, 3);
    assert!(unplaced >= 1);
}

#[tokio::test]
async fn duplicate_roll_numbers_are_rejected() {
    let app = common::build_test_app();
    let mut all = students("CS", 2);
    all.push(json!({ "roll_no": "CS01", "name": "Copy", "branch": "EC" }));

    let response = post_json(
        app,
        "/api/generate_exam_seating",
        json!({ "students": all, "rooms": [{ "name": "Hall A", "rows": 2, "cols": 2 }] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_adjacency_policy_is_a_bad_request() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/api/generate_exam_seating",
        json!({
            "students": students("CS", 1),
            "rooms": [{ "name": "Hall A", "rows": 1, "cols": 1 }],
            "adjacency": "sideways"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());
}
