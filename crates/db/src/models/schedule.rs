//! Section, schedule entry and schedule override rows.

use chrono::NaiveDate;
use sqlx::FromRow;
use timetable_core::adjustment::PreparedOverride;
use timetable_core::calendar::{Day, TimeSlot};
use timetable_core::error::CoreError;
use timetable_core::schedule::{ChangeType, OverrideChange, OverrideRecord, ScheduleEntry};
use timetable_core::types::{DbId, Timestamp};

/// A row from the `sections` table.
#[derive(Debug, Clone, FromRow)]
pub struct SectionRow {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from `schedule_entries` joined with its section name.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleEntryRow {
    pub id: DbId,
    pub section_id: DbId,
    pub section_name: String,
    pub course_name: String,
    pub faculty_name: String,
    pub room_name: String,
    pub day: i16,
    pub hour: i16,
}

/// A row from the `schedule_overrides` table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleOverrideRow {
    pub id: DbId,
    pub original_entry_id: DbId,
    pub override_date: NaiveDate,
    pub original_day: i16,
    pub original_hour: i16,
    pub change_type: String,
    pub new_teacher: Option<String>,
    pub new_day: Option<i16>,
    pub new_hour: Option<i16>,
    pub new_room: Option<String>,
    pub permanent: bool,
    pub created_at: Timestamp,
}

/// Column values for inserting an override.
#[derive(Debug, Clone)]
pub struct NewOverrideRow {
    pub original_entry_id: DbId,
    pub override_date: NaiveDate,
    pub original_day: i16,
    pub original_hour: i16,
    pub change_type: &'static str,
    pub new_teacher: Option<String>,
    pub new_day: Option<i16>,
    pub new_hour: Option<i16>,
    pub new_room: Option<String>,
    pub permanent: bool,
}

impl NewOverrideRow {
    pub fn new(prepared: &PreparedOverride) -> Self {
        let mut row = Self {
            original_entry_id: prepared.original_entry_id,
            override_date: prepared.override_date,
            original_day: day_column(prepared.original_day),
            original_hour: hour_column(prepared.original_time_slot),
            change_type: prepared.change.change_type().as_str(),
            new_teacher: None,
            new_day: None,
            new_hour: None,
            new_room: None,
            permanent: prepared.permanent,
        };
        match &prepared.change {
            OverrideChange::Substitute { new_teacher } => {
                row.new_teacher = Some(new_teacher.clone());
            }
            OverrideChange::Reschedule {
                new_day,
                new_time_slot,
                new_room,
            } => {
                row.new_day = Some(day_column(*new_day));
                row.new_hour = Some(hour_column(*new_time_slot));
                row.new_room = Some(new_room.clone());
            }
        }
        row
    }
}

pub fn day_column(day: Day) -> i16 {
    i16::from(day.index())
}

pub fn hour_column(slot: TimeSlot) -> i16 {
    i16::from(slot.hour())
}

fn day_from_column(value: i16) -> Result<Day, CoreError> {
    u8::try_from(value)
        .ok()
        .and_then(Day::from_index)
        .ok_or_else(|| CoreError::Internal(format!("stored day {value} is out of range")))
}

fn slot_from_column(value: i16) -> Result<TimeSlot, CoreError> {
    u8::try_from(value)
        .ok()
        .and_then(TimeSlot::new)
        .ok_or_else(|| CoreError::Internal(format!("stored hour {value} is out of range")))
}

impl TryFrom<ScheduleEntryRow> for ScheduleEntry {
    type Error = CoreError;

    fn try_from(row: ScheduleEntryRow) -> Result<Self, Self::Error> {
        Ok(ScheduleEntry {
            id: row.id,
            section: row.section_name,
            course: row.course_name,
            faculty: row.faculty_name,
            room: row.room_name,
            day: day_from_column(row.day)?,
            slot: slot_from_column(row.hour)?,
        })
    }
}

impl TryFrom<ScheduleOverrideRow> for OverrideRecord {
    type Error = CoreError;

    fn try_from(row: ScheduleOverrideRow) -> Result<Self, Self::Error> {
        let missing = |column: &str| {
            CoreError::Internal(format!("override {} has no {column}", row.id))
        };

        let change = match row.change_type.parse::<ChangeType>()? {
            ChangeType::Substitute => OverrideChange::Substitute {
                new_teacher: row.new_teacher.clone().ok_or_else(|| missing("new_teacher"))?,
            },
            ChangeType::Reschedule => OverrideChange::Reschedule {
                new_day: day_from_column(row.new_day.ok_or_else(|| missing("new_day"))?)?,
                new_time_slot: slot_from_column(row.new_hour.ok_or_else(|| missing("new_hour"))?)?,
                new_room: row.new_room.clone().ok_or_else(|| missing("new_room"))?,
            },
        };

        Ok(OverrideRecord {
            id: row.id,
            original_entry_id: row.original_entry_id,
            override_date: row.override_date,
            original_day: day_from_column(row.original_day)?,
            original_time_slot: slot_from_column(row.original_hour)?,
            change,
            permanent: row.permanent,
            created_at: row.created_at,
        })
    }
}
