pub mod adjustments;
pub mod faculty;
pub mod schedules;
pub mod seating;
pub mod timetable;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Run CPU-bound engine work off the async runtime, bounded by the
/// configured generation timeout.
///
/// On timeout the blocking task is left to finish on its own; the scheduler's
/// step budget keeps it from running unbounded.
pub(crate) async fn run_blocking<T, F>(state: &AppState, task: &'static str, f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let limit = state.config.generation_timeout();
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_err)) => Err(AppError::InternalError(format!(
            "{task} task failed: {join_err}"
        ))),
        Err(_) => Err(AppError::Timeout(format!(
            "{task} did not finish within {}s",
            limit.as_secs()
        ))),
    }
}

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}
