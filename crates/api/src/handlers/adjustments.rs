//! Handlers for leave-driven schedule adjustments.
//!
//! Finding solutions only reads a snapshot of the store. Applying one goes
//! through [`ScheduleStore::apply_solution`](timetable_db::store::ScheduleStore::apply_solution),
//! which re-validates against the current state before committing.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use timetable_core::adjustment::{ApplyRequest, Conflict, Resolver, Solution};
use timetable_core::error::CoreError;
use timetable_core::normalize::{normalize_leave_request, LeaveRequest};
use timetable_core::schedule::OverrideRecord;
use timetable_core::types::DbId;

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Request body for `POST /api/adjustments/apply-solution`.
#[derive(Debug, Deserialize)]
pub struct ApplySolutionRequest {
    pub entry_id_to_update: DbId,
    pub solution: Solution,
    /// Also rewrite the weekly entry, not just the dated occurrence.
    #[serde(default)]
    pub persist_permanently: bool,
}

#[derive(Debug, Serialize)]
pub struct FindSolutionsResponse {
    pub solutions: Vec<Conflict>,
}

#[derive(Debug, Serialize)]
pub struct ApplySolutionResponse {
    pub message: String,
    #[serde(rename = "override")]
    pub record: OverrideRecord,
}

/// POST /api/adjustments/find-solutions
///
/// List the classes the absent teacher misses between `start_date` and
/// `end_date`, each with substitute and reschedule proposals.
pub async fn find_solutions(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LeaveRequest>,
) -> AppResult<impl IntoResponse> {
    let leave = normalize_leave_request(&input)?;

    let entries = state.store.all_entries().await?;
    let overrides = state.store.all_overrides().await?;
    let mut resolver = Resolver::new(&entries, &overrides).with_week(state.week);
    let solutions = resolver.find_solutions(&leave)?;

    tracing::info!(
        teacher = %leave.teacher_name,
        start = %leave.start_date,
        end = %leave.end_date,
        affected = solutions.len(),
        "Adjustment solutions found",
    );

    Ok(Json(FindSolutionsResponse { solutions }))
}

/// POST /api/adjustments/apply-solution
///
/// Record the chosen solution as an override for its date. A second
/// application for the same class and date is rejected with 409.
pub async fn apply_solution(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ApplySolutionRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .store
        .find_entry(input.entry_id_to_update)
        .await?
        .ok_or_else(|| CoreError::not_found("Schedule entry", input.entry_id_to_update))?;

    let request = ApplyRequest {
        entry_id: entry.id,
        solution: input.solution,
        persist_permanently: input.persist_permanently,
    };

    let _guard = state.section_locks.lock(&entry.section).await;
    let record = state.store.apply_solution(&request, &state.week).await?;

    tracing::info!(
        entry_id = record.original_entry_id,
        section = %entry.section,
        date = %record.override_date,
        change_type = record.change.change_type().as_str(),
        permanent = record.permanent,
        "Adjustment applied",
    );

    Ok(Json(ApplySolutionResponse {
        message: format!("Override for {} has been saved.", record.override_date),
        record,
    }))
}
