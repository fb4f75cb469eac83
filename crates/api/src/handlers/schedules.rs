//! Handlers for saved section schedules.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timetable_core::calendar::{Day, TimeSlot};
use timetable_core::error::CoreError;
use timetable_core::normalize::normalize_section_name;
use timetable_core::schedule::{entries_from_grid, OverrideChange, ScheduleEntry, SubmittedGrid};
use timetable_core::types::DbId;
use timetable_db::store::{DatedOverride, SaveOutcome};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/save_schedule`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveScheduleRequest {
    pub schedule: SubmittedGrid,
    pub section_name: String,
    /// Replace an existing schedule for the section instead of failing.
    #[serde(default)]
    pub overwrite: bool,
}

/// Request body for `POST /api/delete_schedule`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteScheduleRequest {
    pub section_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub view_date: NaiveDate,
}

/// A stored entry as listed by `GET /api/saved_schedules`.
#[derive(Debug, Serialize)]
pub struct SavedEntry {
    pub entry_id: DbId,
    pub day: Day,
    pub time_slot: TimeSlot,
    pub course_name: String,
    pub faculty_name: String,
    pub room_name: String,
}

impl From<ScheduleEntry> for SavedEntry {
    fn from(e: ScheduleEntry) -> Self {
        Self {
            entry_id: e.id,
            day: e.day,
            time_slot: e.slot,
            course_name: e.course,
            faculty_name: e.faculty,
            room_name: e.room,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OriginalClass {
    pub course_name: String,
    pub day: Day,
    pub time_slot: TimeSlot,
}

/// An override as shown in the dated view. `change_type` and the `new_*`
/// fields come from the flattened change.
#[derive(Debug, Serialize)]
pub struct OverrideView {
    pub id: DbId,
    pub original_entry_id: DbId,
    pub override_date: NaiveDate,
    #[serde(flatten)]
    pub change: OverrideChange,
    pub permanent: bool,
    pub original_class: OriginalClass,
}

impl From<DatedOverride> for OverrideView {
    fn from(d: DatedOverride) -> Self {
        Self {
            id: d.record.id,
            original_entry_id: d.record.original_entry_id,
            override_date: d.record.override_date,
            change: d.record.change,
            permanent: d.record.permanent,
            original_class: OriginalClass {
                course_name: d.original.course,
                day: d.original.day,
                time_slot: d.original.slot,
            },
        }
    }
}

/// Response body for `GET /api/schedule/view/{section}`.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub section: String,
    pub date: NaiveDate,
    /// `null` on weekends.
    pub day: Option<Day>,
    pub entries: Vec<SavedEntry>,
    pub overrides: Vec<OverrideView>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/save_schedule
///
/// Store a section's weekly grid. Returns 201 for a new section and 200 when
/// an existing schedule was replaced with `overwrite: true`.
pub async fn save_schedule(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SaveScheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let section = normalize_section_name(&input.section_name)?;
    let entries = entries_from_grid(&input.schedule, &state.week)?;
    if entries.is_empty() {
        return Err(CoreError::invalid("schedule", "must contain at least one class").into());
    }

    let _guard = state.section_locks.lock(&section).await;
    let outcome = state
        .store
        .save_section(&section, &entries, input.overwrite)
        .await?;

    tracing::info!(
        section = %section,
        entries = entries.len(),
        outcome = ?outcome,
        "Schedule saved",
    );

    let status = match outcome {
        SaveOutcome::Created => StatusCode::CREATED,
        SaveOutcome::Replaced => StatusCode::OK,
    };
    Ok((
        status,
        Json(MessageResponse::new(format!(
            "Timetable for {section} saved successfully!"
        ))),
    ))
}

/// GET /api/saved_schedules
///
/// Every saved section with its entries in day and slot order.
pub async fn saved_schedules(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let grouped: BTreeMap<String, Vec<SavedEntry>> = state
        .store
        .list_all()
        .await?
        .into_iter()
        .map(|(section, entries)| (section, entries.into_iter().map(SavedEntry::from).collect()))
        .collect();

    Ok(Json(grouped))
}

/// GET /api/schedule/view/{section}?view_date=YYYY-MM-DD
///
/// A section's classes on one date plus the overrides affecting that date.
pub async fn view_schedule(
    State(state): State<AppState>,
    Path(section): Path<String>,
    ApiQuery(query): ApiQuery<ViewQuery>,
) -> AppResult<impl IntoResponse> {
    let view = state.store.view_on_date(&section, query.view_date).await?;

    Ok(Json(ScheduleView {
        section: view.section,
        date: view.date,
        day: view.day,
        entries: view.entries.into_iter().map(SavedEntry::from).collect(),
        overrides: view.overrides.into_iter().map(OverrideView::from).collect(),
    }))
}

/// POST /api/delete_schedule
pub async fn delete_schedule(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DeleteScheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let section = normalize_section_name(&input.section_name)?;

    {
        let _guard = state.section_locks.lock(&section).await;
        state.store.delete_section(&section).await?;
    }
    state.section_locks.forget(&section).await;

    tracing::info!(section = %section, "Schedule deleted");

    Ok(Json(MessageResponse::new(format!(
        "Schedule for {section} deleted."
    ))))
}

/// POST /api/clear_all_schedules
///
/// Remove every section, entry and override.
pub async fn clear_all_schedules(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let summary = state.store.clear_all().await?;
    state.section_locks.clear().await;

    tracing::info!(
        sections = summary.sections,
        entries = summary.entries,
        overrides = summary.overrides,
        "Cleared all schedules",
    );

    Ok(Json(MessageResponse::new(
        "Cleared all schedule entries and overrides.",
    )))
}
