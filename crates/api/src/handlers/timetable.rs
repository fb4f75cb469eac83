//! Handler for weekly timetable generation.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use timetable_core::normalize::{normalize_courses, normalize_rooms, CourseInput};
use timetable_core::occupancy::Occupancy;
use timetable_core::timetable::{generate, TimetableOptions};

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::handlers::run_blocking;
use crate::state::AppState;

/// Request body for `POST /api/generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTimetableRequest {
    pub courses: Vec<CourseInput>,
    pub rooms: Vec<String>,
    /// Keep the lunch slot free on every day.
    #[serde(default)]
    pub include_lunch_break: bool,
}

/// POST /api/generate
///
/// Build a weekly grid for one section. Faculty and rooms already used by
/// saved sections are treated as busy. Courses that cannot be fully placed
/// are listed in `unplaced` rather than failing the request.
pub async fn generate_timetable(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<GenerateTimetableRequest>,
) -> AppResult<impl IntoResponse> {
    let courses = normalize_courses(&input.courses)?;
    let rooms = normalize_rooms(&input.rooms)?;

    let stored = state.store.all_entries().await?;
    let busy = Occupancy::from_entries(&stored);
    let week = state.week;
    let options = TimetableOptions {
        include_lunch_break: input.include_lunch_break,
        max_steps: state.config.scheduler_max_steps,
    };

    let course_count = courses.len();
    let timetable = run_blocking(&state, "Timetable generation", move || {
        generate(&courses, &rooms, &busy, &week, &options)
    })
    .await?;

    if !timetable.unplaced.is_empty() {
        tracing::warn!(
            unplaced = ?timetable.unplaced,
            "Some courses could not be placed",
        );
    }
    tracing::info!(
        courses = course_count,
        sessions = timetable.session_count(),
        strategy = ?timetable.strategy,
        "Timetable generated",
    );

    Ok(Json(timetable))
}
