//! HTTP-level tests for the leave-adjustment flow: find solutions, apply
//! one, and see it in the dated view.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, post_json, save_section};
use serde_json::{json, Value};

/// CS-A: Alice teaches Math on Monday 9, Bob teaches Phys on Monday 10.
/// CS-B: Carol teaches Math on Monday 9.
async fn seeded_app() -> Router {
    let app = common::build_test_app();
    save_section(
        &app,
        "CS-A",
        &[
            ("Monday", "9:00 AM", "Math", "Alice", "R1"),
            ("Monday", "10:00 AM", "Phys", "Bob", "R1"),
        ],
    )
    .await;
    save_section(&app, "CS-B", &[("Monday", "9:00 AM", "Math", "Carol", "R2")]).await;
    app
}

async fn find(app: &Router, teacher: &str, start: &str, end: &str) -> (StatusCode, Value) {
    let response = post_json(
        app.clone(),
        "/api/adjustments/find-solutions",
        json!({ "teacher_name": teacher, "start_date": start, "end_date": end }),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn apply(app: &Router, entry_id: &Value, solution: &Value) -> (StatusCode, Value) {
    let response = post_json(
        app.clone(),
        "/api/adjustments/apply-solution",
        json!({ "entry_id_to_update": entry_id, "solution": solution }),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

// ---------------------------------------------------------------------------
// Finding solutions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leave_on_monday_proposes_substitute_and_reschedules() {
    let app = seeded_app().await;
    let (status, json) = find(&app, "Alice", "2025-03-10", "2025-03-10").await;

    assert_eq!(status, StatusCode::OK);
    let conflicts = json["solutions"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);

    let conflict = &conflicts[0];
    assert_eq!(conflict["original_class"], "Math (CS-A) on Monday at 9:00 AM");
    assert_eq!(conflict["section_name"], "CS-A");
    assert_eq!(conflict["date"], "2025-03-10");
    assert_eq!(conflict["resolved"], false);

    let solutions = conflict["solutions"].as_array().unwrap();
    // Carol is busy at 9 in CS-B; Bob is free.
    assert_eq!(solutions[0]["type"], "SUBSTITUTE");
    assert_eq!(solutions[0]["new_teacher"], "Bob");
    assert_eq!(solutions[0]["details"], "Assign Bob");
    assert_eq!(solutions[0]["override_date"], "2025-03-10");

    let reschedules: Vec<&Value> = solutions.iter().filter(|s| s["type"] == "RESCHEDULE").collect();
    assert_eq!(reschedules.len(), 3);
    // Monday is inside the leave window, so the first option is Tuesday.
    assert_eq!(reschedules[0]["new_day"], "Tuesday");
    assert_eq!(reschedules[0]["new_time_slot"], "9:00 AM");
    assert_eq!(reschedules[0]["new_room"], "R1");
    assert_eq!(reschedules[0]["details"], "Move to Tuesday, 9:00 AM in R1");
}

#[tokio::test]
async fn no_classes_in_range_returns_empty_list() {
    let app = seeded_app().await;
    let (status, json) = find(&app, "Alice", "2025-03-11", "2025-03-14").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["solutions"], json!([]));
}

#[tokio::test]
async fn unknown_teacher_is_404() {
    let app = seeded_app().await;
    let (status, json) = find(&app, "Zed", "2025-03-10", "2025-03-10").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn reversed_window_is_a_validation_error() {
    let app = seeded_app().await;
    let (status, json) = find(&app, "Alice", "2025-03-14", "2025-03-10").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

#[tokio::test]
async fn applying_a_substitute_twice_conflicts() {
    let app = seeded_app().await;
    let (_, found) = find(&app, "Alice", "2025-03-10", "2025-03-10").await;
    let conflict = &found["solutions"][0];
    let substitute = &conflict["solutions"][0];

    let (status, json) = apply(&app, &conflict["conflict_entry_id"], substitute).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Override for 2025-03-10 has been saved.");
    assert_eq!(json["override"]["change_type"], "SUBSTITUTE");
    assert_eq!(json["override"]["new_teacher"], "Bob");
    assert_eq!(json["override"]["permanent"], false);

    let (status, json) = apply(&app, &conflict["conflict_entry_id"], substitute).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT_ALREADY_RESOLVED");

    // The occurrence now shows as resolved with nothing left to choose.
    let (_, again) = find(&app, "Alice", "2025-03-10", "2025-03-10").await;
    assert_eq!(again["solutions"][0]["resolved"], true);
    assert_eq!(again["solutions"][0]["solutions"], json!([]));
}

#[tokio::test]
async fn applied_override_appears_in_dated_view() {
    let app = seeded_app().await;
    let (_, found) = find(&app, "Alice", "2025-03-10", "2025-03-10").await;
    let conflict = &found["solutions"][0];
    let reschedule = conflict["solutions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["type"] == "RESCHEDULE")
        .unwrap()
        .clone();

    let (status, _) = apply(&app, &conflict["conflict_entry_id"], &reschedule).await;
    assert_eq!(status, StatusCode::OK);

    let monday = body_json(get(app.clone(), "/api/schedule/view/CS-A?view_date=2025-03-10").await).await;
    let overrides = monday["overrides"].as_array().unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0]["change_type"], "RESCHEDULE");
    assert_eq!(overrides[0]["new_day"], "Tuesday");
    assert_eq!(overrides[0]["original_class"]["course_name"], "Math");
    assert_eq!(overrides[0]["original_class"]["day"], "Monday");
    assert_eq!(overrides[0]["original_class"]["time_slot"], "9:00 AM");

    // The moved class also shows up on the Tuesday it lands on.
    let tuesday = body_json(get(app, "/api/schedule/view/CS-A?view_date=2025-03-11").await).await;
    assert_eq!(tuesday["overrides"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn substitute_who_is_busy_is_a_conflict() {
    let app = seeded_app().await;
    let solution = json!({
        "type": "SUBSTITUTE",
        "details": "Assign Carol",
        "override_date": "2025-03-10",
        "new_teacher": "Carol"
    });

    let (status, json) = apply(&app, &json!(1), &solution).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn date_on_the_wrong_weekday_is_rejected() {
    let app = seeded_app().await;
    // 2025-03-11 is a Tuesday; entry 1 meets on Mondays.
    let solution = json!({
        "type": "SUBSTITUTE",
        "details": "Assign Bob",
        "override_date": "2025-03-11",
        "new_teacher": "Bob"
    });

    let (status, json) = apply(&app, &json!(1), &solution).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_entry_is_404() {
    let app = seeded_app().await;
    let solution = json!({
        "type": "SUBSTITUTE",
        "override_date": "2025-03-10",
        "new_teacher": "Bob"
    });

    let (status, _) = apply(&app, &json!(999), &solution).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn permanent_substitute_rewrites_weekly_entry() {
    let app = seeded_app().await;
    let response = post_json(
        app.clone(),
        "/api/adjustments/apply-solution",
        json!({
            "entry_id_to_update": 1,
            "solution": {
                "type": "SUBSTITUTE",
                "override_date": "2025-03-10",
                "new_teacher": "Bob"
            },
            "persist_permanently": true
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["override"]["permanent"], true);

    let json = body_json(get(app, "/api/saved_schedules").await).await;
    assert_eq!(json["CS-A"][0]["faculty_name"], "Bob");
}

#[tokio::test]
async fn permanent_reschedule_reapplied_conflicts_and_keeps_original_class() {
    let app = seeded_app().await;
    let solution = json!({
        "type": "RESCHEDULE",
        "override_date": "2025-03-10",
        "new_day": "Thursday",
        "new_time_slot": "2:00 PM",
        "new_room": "R1"
    });
    let body = json!({
        "entry_id_to_update": 1,
        "solution": solution,
        "persist_permanently": true
    });

    let first = post_json(app.clone(), "/api/adjustments/apply-solution", body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json(app.clone(), "/api/adjustments/apply-solution", body).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "CONFLICT_ALREADY_RESOLVED");

    let thursday = body_json(get(app, "/api/schedule/view/CS-A?view_date=2025-03-13").await).await;
    let overrides = thursday["overrides"].as_array().unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0]["original_class"]["day"], "Monday");
    assert_eq!(overrides[0]["original_class"]["time_slot"], "9:00 AM");
}
