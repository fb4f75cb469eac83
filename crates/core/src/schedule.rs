//! Persisted schedule shapes: weekly entries and dated overrides.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{Day, TimeSlot, WorkingWeek};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One weekly course session of a section, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "entry_id")]
    pub id: DbId,
    #[serde(rename = "section_name")]
    pub section: String,
    #[serde(rename = "course_name")]
    pub course: String,
    #[serde(rename = "faculty_name")]
    pub faculty: String,
    #[serde(rename = "room_name")]
    pub room: String,
    pub day: Day,
    #[serde(rename = "time_slot")]
    pub slot: TimeSlot,
}

impl ScheduleEntry {
    /// Human-readable description, e.g. `Math (CS-A) on Monday at 9:00 AM`.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}) on {} at {}",
            self.course, self.section, self.day, self.slot
        )
    }
}

/// An entry about to be stored; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEntry {
    pub course: String,
    pub faculty: String,
    pub room: String,
    pub day: Day,
    pub slot: TimeSlot,
}

/// A filled cell of a weekly grid as submitted for saving.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetail {
    pub course_name: String,
    pub faculty_name: String,
    pub room_name: String,
}

/// A weekly grid as the front end submits it: day name → slot label → cell.
pub type SubmittedGrid = BTreeMap<String, BTreeMap<String, Option<SlotDetail>>>;

/// Flatten a submitted grid into entries, ordered by day then slot.
///
/// Empty cells are skipped. Unknown day names, malformed slot labels, slots
/// outside the working week and blank names are rejected.
pub fn entries_from_grid(
    grid: &SubmittedGrid,
    week: &WorkingWeek,
) -> Result<Vec<NewScheduleEntry>, CoreError> {
    let mut entries = Vec::new();

    for (day_name, cells) in grid {
        let day: Day = day_name.parse()?;
        for (slot_label, cell) in cells {
            let Some(detail) = cell else { continue };
            let slot: TimeSlot = slot_label.parse()?;
            if !week.contains(slot) {
                return Err(CoreError::invalid(
                    format!("schedule.{day_name}.{slot_label}"),
                    "slot is outside the working day",
                ));
            }

            let field = |name: &str| format!("schedule.{day_name}.{slot_label}.{name}");
            let course = required(&detail.course_name, || field("courseName"))?;
            let faculty = required(&detail.faculty_name, || field("facultyName"))?;
            let room = required(&detail.room_name, || field("roomName"))?;

            entries.push(NewScheduleEntry {
                course,
                faculty,
                room,
                day,
                slot,
            });
        }
    }

    entries.sort_by_key(|e| (e.day, e.slot));
    if let Some(pair) = entries
        .windows(2)
        .find(|w| w[0].day == w[1].day && w[0].slot == w[1].slot)
    {
        // Two spellings of the same day or slot (e.g. "Mon" and "Monday").
        return Err(CoreError::invalid(
            "schedule",
            format!("{} at {} appears more than once", pair[0].day, pair[0].slot),
        ));
    }

    Ok(entries)
}

fn required(value: &str, field: impl FnOnce() -> String) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid(field(), "must not be empty"));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// The two kinds of adjustment a leave can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Substitute,
    Reschedule,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Substitute => "SUBSTITUTE",
            ChangeType::Reschedule => "RESCHEDULE",
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBSTITUTE" => Ok(ChangeType::Substitute),
            "RESCHEDULE" => Ok(ChangeType::Reschedule),
            other => Err(CoreError::invalid(
                "change_type",
                format!("unknown change type \"{other}\""),
            )),
        }
    }
}

/// What an override changes about its original entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideChange {
    /// Same day, slot and room; another teacher.
    Substitute { new_teacher: String },
    /// Same teacher; another day, slot and room in the same week.
    Reschedule {
        new_day: Day,
        new_time_slot: TimeSlot,
        new_room: String,
    },
}

impl OverrideChange {
    pub fn change_type(&self) -> ChangeType {
        match self {
            OverrideChange::Substitute { .. } => ChangeType::Substitute,
            OverrideChange::Reschedule { .. } => ChangeType::Reschedule,
        }
    }
}

/// A dated exception layered on a weekly entry.
///
/// `override_date` is the date the original entry would have met on, and
/// `original_day`/`original_time_slot` the placement it had when the
/// override was made. A permanent change moves the weekly entry afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub id: DbId,
    pub original_entry_id: DbId,
    pub override_date: NaiveDate,
    pub original_day: Day,
    pub original_time_slot: TimeSlot,
    #[serde(flatten)]
    pub change: OverrideChange,
    pub permanent: bool,
    pub created_at: Timestamp,
}

impl OverrideRecord {
    /// The date the session actually takes place on after this override.
    pub fn effective_date(&self) -> NaiveDate {
        match &self.change {
            OverrideChange::Substitute { .. } => self.override_date,
            OverrideChange::Reschedule { new_day, .. } => {
                crate::calendar::date_in_week(crate::calendar::week_start(self.override_date), *new_day)
            }
        }
    }

    /// Whether this override changes what happens on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.override_date == date || self.effective_date() == date
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
