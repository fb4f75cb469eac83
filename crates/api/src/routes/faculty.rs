use axum::routing::get;
use axum::Router;

use crate::handlers::faculty;
use crate::state::AppState;

/// Routes mounted at `/faculty`.
///
/// ```text
/// GET /{name}/schedule -> faculty_schedule
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{name}/schedule", get(faculty::faculty_schedule))
}
