//! Handler for a faculty member's weekly schedule.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use timetable_core::error::CoreError;
use timetable_core::schedule::ScheduleEntry;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FacultySchedule {
    pub faculty: String,
    pub entries: Vec<ScheduleEntry>,
}

/// GET /api/faculty/{name}/schedule
///
/// Weekly classes taught by `name` across all saved sections.
/// Returns 404 when the name does not appear in any schedule.
pub async fn faculty_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let faculty = name.trim().to_string();
    let entries = state.store.entries_for_faculty(&faculty).await?;
    if entries.is_empty() {
        return Err(CoreError::not_found("Faculty", &faculty).into());
    }

    Ok(Json(FacultySchedule { faculty, entries }))
}
