//! The schedule store: sections, weekly entries and dated overrides.
//!
//! [`ScheduleStore`] is the seam between the HTTP layer and persistence.
//! [`MemoryStore`] keeps everything behind a single `RwLock`; [`PgStore`]
//! persists to PostgreSQL through the repositories.

mod memory;
mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use timetable_core::adjustment::ApplyRequest;
use timetable_core::calendar::{Day, WorkingWeek};
use timetable_core::error::CoreError;
use timetable_core::occupancy::Occupancy;
use timetable_core::schedule::{NewScheduleEntry, OverrideRecord, ScheduleEntry};
use timetable_core::types::DbId;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether a save created a new section or replaced an existing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Replaced,
}

/// Rows removed by [`ScheduleStore::clear_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub sections: u64,
    pub entries: u64,
    pub overrides: u64,
}

/// An override together with the weekly entry it changes, at the placement
/// the entry had when the override was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedOverride {
    pub record: OverrideRecord,
    pub original: ScheduleEntry,
}

/// What a section's schedule looks like on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateView {
    pub section: String,
    pub date: NaiveDate,
    /// `None` on weekends.
    pub day: Option<Day>,
    /// Weekly entries meeting on that weekday, by slot.
    pub entries: Vec<ScheduleEntry>,
    /// Overrides changing something on that date.
    pub overrides: Vec<DatedOverride>,
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Store a section's weekly schedule.
    ///
    /// Fails with `DuplicateSection` if the section exists and `overwrite`
    /// is false. Overwriting drops the old entries and their overrides.
    /// Entries that would double-book faculty or rooms held by other
    /// sections are rejected with `Conflict`.
    async fn save_section(
        &self,
        section: &str,
        entries: &[NewScheduleEntry],
        overwrite: bool,
    ) -> Result<SaveOutcome, StoreError>;

    /// Every section with its entries ordered by day and slot.
    async fn list_all(&self) -> Result<BTreeMap<String, Vec<ScheduleEntry>>, StoreError>;

    async fn all_entries(&self) -> Result<Vec<ScheduleEntry>, StoreError>;

    async fn all_overrides(&self) -> Result<Vec<OverrideRecord>, StoreError>;

    async fn find_entry(&self, id: DbId) -> Result<Option<ScheduleEntry>, StoreError>;

    /// Remove a section with its entries and overrides.
    async fn delete_section(&self, section: &str) -> Result<(), StoreError>;

    async fn view_on_date(&self, section: &str, date: NaiveDate) -> Result<DateView, StoreError>;

    /// Weekly entries taught by `faculty` across all sections.
    async fn entries_for_faculty(&self, faculty: &str) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Validate a chosen adjustment against the current state and commit it
    /// atomically.
    async fn apply_solution(
        &self,
        request: &ApplyRequest,
        week: &WorkingWeek,
    ) -> Result<OverrideRecord, StoreError>;

    async fn clear_all(&self) -> Result<ClearSummary, StoreError>;

    /// Check the backend can serve requests.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Reject entries that would put a faculty member or room in two places at
/// once, given the entries stored for other sections.
pub fn check_double_booking(
    section: &str,
    entries: &[NewScheduleEntry],
    stored: &[ScheduleEntry],
) -> Result<(), CoreError> {
    let others = Occupancy::from_entries(stored.iter().filter(|e| e.section != section));

    for e in entries {
        if let Some(holder) = others.faculty_holder(e.day, e.slot, &e.faculty) {
            return Err(CoreError::Conflict(format!(
                "{} already teaches {holder} on {} at {}",
                e.faculty, e.day, e.slot
            )));
        }
        if let Some(holder) = others.room_holder(e.day, e.slot, &e.room) {
            return Err(CoreError::Conflict(format!(
                "Room {} is used by {holder} on {} at {}",
                e.room, e.day, e.slot
            )));
        }
    }
    Ok(())
}

/// Group entries by section name, keeping each section's entries in day and
/// slot order.
pub fn group_by_section(entries: Vec<ScheduleEntry>) -> BTreeMap<String, Vec<ScheduleEntry>> {
    let mut grouped: BTreeMap<String, Vec<ScheduleEntry>> = BTreeMap::new();
    for e in entries {
        grouped.entry(e.section.clone()).or_default().push(e);
    }
    for list in grouped.values_mut() {
        list.sort_by_key(|e| (e.day, e.slot));
    }
    grouped
}

/// Build the view of `section` on `date` from its entries and all overrides.
pub fn view_for_date(
    section: &str,
    date: NaiveDate,
    section_entries: &[ScheduleEntry],
    overrides: &[OverrideRecord],
) -> DateView {
    let day = Day::of_date(date);

    let mut entries: Vec<ScheduleEntry> = section_entries
        .iter()
        .filter(|e| Some(e.day) == day)
        .cloned()
        .collect();
    entries.sort_by_key(|e| e.slot);

    let mut dated: Vec<DatedOverride> = overrides
        .iter()
        .filter(|o| o.applies_on(date))
        .filter_map(|o| {
            section_entries
                .iter()
                .find(|e| e.id == o.original_entry_id)
                .map(|current| DatedOverride {
                    record: o.clone(),
                    original: ScheduleEntry {
                        day: o.original_day,
                        slot: o.original_time_slot,
                        ..current.clone()
                    },
                })
        })
        .collect();
    dated.sort_by_key(|d| (d.original.slot, d.record.id));

    DateView {
        section: section.to_string(),
        date,
        day,
        entries,
        overrides: dated,
    }
}

#[cfg(test)]
mod tests {
    use timetable_core::calendar::TimeSlot;
    use timetable_core::schedule::OverrideChange;

    use super::*;

    fn slot(h: u8) -> TimeSlot {
        TimeSlot::new(h).unwrap()
    }

    fn stored(id: DbId, section: &str, faculty: &str, room: &str) -> ScheduleEntry {
        ScheduleEntry {
            id,
            section: section.into(),
            course: "Math".into(),
            faculty: faculty.into(),
            room: room.into(),
            day: Day::Monday,
            slot: slot(9),
        }
    }

    fn new_entry(faculty: &str, room: &str) -> NewScheduleEntry {
        NewScheduleEntry {
            course: "Phys".into(),
            faculty: faculty.into(),
            room: room.into(),
            day: Day::Monday,
            slot: slot(9),
        }
    }

    #[test]
    fn double_booked_faculty_is_a_conflict() {
        let err = check_double_booking(
            "CS-B",
            &[new_entry("A", "R2")],
            &[stored(1, "CS-A", "A", "R1")],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ref m) if m.contains("CS-A")));
    }

    #[test]
    fn double_booked_room_is_a_conflict() {
        assert!(check_double_booking(
            "CS-B",
            &[new_entry("B", "R1")],
            &[stored(1, "CS-A", "A", "R1")]
        )
        .is_err());
    }

    #[test]
    fn own_section_is_ignored_when_overwriting() {
        assert!(check_double_booking(
            "CS-A",
            &[new_entry("A", "R1")],
            &[stored(1, "CS-A", "A", "R1")]
        )
        .is_ok());
    }

    #[test]
    fn view_includes_reschedule_landing_on_date() {
        let entries = [stored(1, "CS-A", "A", "R1")];
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let thursday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        let overrides = [OverrideRecord {
            id: 5,
            original_entry_id: 1,
            override_date: monday,
            original_day: Day::Monday,
            original_time_slot: slot(9),
            change: OverrideChange::Reschedule {
                new_day: Day::Thursday,
                new_time_slot: slot(11),
                new_room: "R2".into(),
            },
            permanent: false,
            created_at: chrono::Utc::now(),
        }];

        let on_monday = view_for_date("CS-A", monday, &entries, &overrides);
        assert_eq!(on_monday.entries.len(), 1);
        assert_eq!(on_monday.overrides.len(), 1);

        let on_thursday = view_for_date("CS-A", thursday, &entries, &overrides);
        assert_eq!(on_thursday.day, Some(Day::Thursday));
        assert!(on_thursday.entries.is_empty());
        assert_eq!(on_thursday.overrides[0].record.id, 5);

        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let weekend = view_for_date("CS-A", saturday, &entries, &overrides);
        assert_eq!(weekend.day, None);
        assert!(weekend.overrides.is_empty());
    }

    #[test]
    fn view_reports_placement_before_a_permanent_move() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let thursday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        // The weekly entry already sits on Thursday 14:00 after the move.
        let mut moved = stored(1, "CS-A", "A", "R1");
        moved.day = Day::Thursday;
        moved.slot = slot(14);
        let overrides = [OverrideRecord {
            id: 5,
            original_entry_id: 1,
            override_date: monday,
            original_day: Day::Monday,
            original_time_slot: slot(9),
            change: OverrideChange::Reschedule {
                new_day: Day::Thursday,
                new_time_slot: slot(14),
                new_room: "R1".into(),
            },
            permanent: true,
            created_at: chrono::Utc::now(),
        }];

        let view = view_for_date("CS-A", thursday, &[moved], &overrides);
        assert_eq!(view.overrides.len(), 1);
        assert_eq!(view.overrides[0].original.day, Day::Monday);
        assert_eq!(view.overrides[0].original.slot, slot(9));
        assert_eq!(view.overrides[0].original.course, "Math");
    }
}
