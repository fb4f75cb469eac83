//! Handler for exam-seating allocation.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use timetable_core::normalize::{normalize_exam_rooms, normalize_students, ExamRoomInput, Student};
use timetable_core::seating::{allocate, AdjacencyPolicy};

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::handlers::run_blocking;
use crate::state::AppState;

/// Request body for `POST /api/generate_exam_seating`.
#[derive(Debug, Deserialize)]
pub struct ExamSeatingRequest {
    pub students: Vec<Student>,
    pub rooms: Vec<ExamRoomInput>,
    /// `"orthogonal"` (default) or `"diagonal"`.
    #[serde(default)]
    pub adjacency: AdjacencyPolicy,
}

/// POST /api/generate_exam_seating
pub async fn generate_exam_seating(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ExamSeatingRequest>,
) -> AppResult<impl IntoResponse> {
    let students = normalize_students(&input.students)?;
    let rooms = normalize_exam_rooms(&input.rooms)?;
    let policy = input.adjacency;

    let plan = run_blocking(&state, "Seating allocation", move || {
        allocate(&students, &rooms, policy)
    })
    .await?;

    if !plan.unplaced.is_empty() {
        tracing::warn!(
            unplaced = plan.unplaced.len(),
            "Exam rooms cannot seat every student",
        );
    }
    tracing::info!(
        seated = plan.assignments.len(),
        adjacent_conflicts = plan.adjacent_conflicts,
        policy = ?policy,
        "Exam seating allocated",
    );

    Ok(Json(plan))
}
