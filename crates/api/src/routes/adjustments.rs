use axum::routing::post;
use axum::Router;

use crate::handlers::adjustments;
use crate::state::AppState;

/// Routes mounted at `/adjustments`.
///
/// ```text
/// POST /find-solutions  -> find_solutions
/// POST /apply-solution  -> apply_solution
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/find-solutions", post(adjustments::find_solutions))
        .route("/apply-solution", post(adjustments::apply_solution))
}
