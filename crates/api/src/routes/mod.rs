pub mod adjustments;
pub mod faculty;
pub mod health;
pub mod schedules;
pub mod seating;
pub mod timetable;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                          generate a weekly timetable (POST)
/// /generate_exam_seating             allocate exam seats (POST)
///
/// /save_schedule                     store a section schedule (POST)
/// /saved_schedules                   list all sections (GET)
/// /schedule/view/{section}           section on a date (GET ?view_date=)
/// /delete_schedule                   remove a section (POST)
/// /clear_all_schedules               remove everything (POST)
///
/// /adjustments/find-solutions        leave impact and proposals (POST)
/// /adjustments/apply-solution        commit a proposal (POST)
///
/// /faculty/{name}/schedule           weekly classes of one teacher (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(timetable::router())
        .merge(seating::router())
        .merge(schedules::router())
        .nest("/adjustments", adjustments::router())
        .nest("/faculty", faculty::router())
}
