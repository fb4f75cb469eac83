//! Saved section schedules. The paths keep the flat names the front end
//! already calls.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::schedules;
use crate::state::AppState;

/// ```text
/// POST /save_schedule             -> save_schedule
/// GET  /saved_schedules           -> saved_schedules
/// GET  /schedule/view/{section}   -> view_schedule
/// POST /delete_schedule           -> delete_schedule
/// POST /clear_all_schedules       -> clear_all_schedules
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/save_schedule", post(schedules::save_schedule))
        .route("/saved_schedules", get(schedules::saved_schedules))
        .route("/schedule/view/{section}", get(schedules::view_schedule))
        .route("/delete_schedule", post(schedules::delete_schedule))
        .route("/clear_all_schedules", post(schedules::clear_all_schedules))
}
