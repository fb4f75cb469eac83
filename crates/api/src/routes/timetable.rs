use axum::routing::post;
use axum::Router;

use crate::handlers::timetable;
use crate::state::AppState;

/// ```text
/// POST /generate -> generate_timetable
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(timetable::generate_timetable))
}
