use axum::routing::post;
use axum::Router;

use crate::handlers::seating;
use crate::state::AppState;

/// ```text
/// POST /generate_exam_seating -> generate_exam_seating
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/generate_exam_seating",
        post(seating::generate_exam_seating),
    )
}
