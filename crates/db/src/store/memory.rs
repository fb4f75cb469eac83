//! In-process store used when no database is configured, and in tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use timetable_core::adjustment::{ApplyRequest, Resolver};
use timetable_core::calendar::WorkingWeek;
use timetable_core::error::CoreError;
use timetable_core::schedule::{NewScheduleEntry, OverrideRecord, ScheduleEntry};
use timetable_core::types::DbId;
use tokio::sync::RwLock;

use super::{
    check_double_booking, group_by_section, view_for_date, ClearSummary, DateView, SaveOutcome,
    ScheduleStore, StoreError,
};

#[derive(Debug, Default)]
struct State {
    sections: BTreeSet<String>,
    entries: BTreeMap<DbId, ScheduleEntry>,
    overrides: BTreeMap<DbId, OverrideRecord>,
    last_entry_id: DbId,
    last_override_id: DbId,
}

impl State {
    fn entry_snapshot(&self) -> Vec<ScheduleEntry> {
        self.entries.values().cloned().collect()
    }

    fn override_snapshot(&self) -> Vec<OverrideRecord> {
        self.overrides.values().cloned().collect()
    }

    fn section_entries(&self, section: &str) -> Vec<ScheduleEntry> {
        self.entries
            .values()
            .filter(|e| e.section == section)
            .cloned()
            .collect()
    }

    /// Drop a section's entries and every override attached to them.
    fn remove_section_entries(&mut self, section: &str) {
        let removed: BTreeSet<DbId> = self
            .entries
            .values()
            .filter(|e| e.section == section)
            .map(|e| e.id)
            .collect();
        self.entries.retain(|id, _| !removed.contains(id));
        self.overrides
            .retain(|_, o| !removed.contains(&o.original_entry_id));
    }
}

/// Schedule store held in memory. Every write runs in one critical section
/// of the lock, so validation and commit are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn save_section(
        &self,
        section: &str,
        entries: &[NewScheduleEntry],
        overwrite: bool,
    ) -> Result<SaveOutcome, StoreError> {
        let mut state = self.state.write().await;

        let exists = state.sections.contains(section);
        if exists && !overwrite {
            return Err(CoreError::DuplicateSection(section.to_string()).into());
        }
        check_double_booking(section, entries, &state.entry_snapshot())?;

        if exists {
            state.remove_section_entries(section);
        }
        state.sections.insert(section.to_string());
        for e in entries {
            state.last_entry_id += 1;
            let id = state.last_entry_id;
            state.entries.insert(
                id,
                ScheduleEntry {
                    id,
                    section: section.to_string(),
                    course: e.course.clone(),
                    faculty: e.faculty.clone(),
                    room: e.room.clone(),
                    day: e.day,
                    slot: e.slot,
                },
            );
        }

        Ok(if exists {
            SaveOutcome::Replaced
        } else {
            SaveOutcome::Created
        })
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Vec<ScheduleEntry>>, StoreError> {
        let state = self.state.read().await;
        let mut grouped = group_by_section(state.entry_snapshot());
        for section in &state.sections {
            grouped.entry(section.clone()).or_default();
        }
        Ok(grouped)
    }

    async fn all_entries(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.state.read().await.entry_snapshot())
    }

    async fn all_overrides(&self) -> Result<Vec<OverrideRecord>, StoreError> {
        Ok(self.state.read().await.override_snapshot())
    }

    async fn find_entry(&self, id: DbId) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(self.state.read().await.entries.get(&id).cloned())
    }

    async fn delete_section(&self, section: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.sections.remove(section) {
            return Err(CoreError::not_found("Section", section).into());
        }
        state.remove_section_entries(section);
        Ok(())
    }

    async fn view_on_date(&self, section: &str, date: NaiveDate) -> Result<DateView, StoreError> {
        let state = self.state.read().await;
        if !state.sections.contains(section) {
            return Err(CoreError::not_found("Section", section).into());
        }
        Ok(view_for_date(
            section,
            date,
            &state.section_entries(section),
            &state.override_snapshot(),
        ))
    }

    async fn entries_for_faculty(&self, faculty: &str) -> Result<Vec<ScheduleEntry>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<ScheduleEntry> = state
            .entries
            .values()
            .filter(|e| e.faculty == faculty)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (a.day, a.slot, &a.section).cmp(&(b.day, b.slot, &b.section)));
        Ok(entries)
    }

    async fn apply_solution(
        &self,
        request: &ApplyRequest,
        week: &WorkingWeek,
    ) -> Result<OverrideRecord, StoreError> {
        let mut state = self.state.write().await;

        let entries = state.entry_snapshot();
        let overrides = state.override_snapshot();
        let mut resolver = Resolver::new(&entries, &overrides).with_week(*week);
        let prepared = resolver.apply(request)?;

        state.last_override_id += 1;
        let record = OverrideRecord {
            id: state.last_override_id,
            original_entry_id: prepared.original_entry_id,
            override_date: prepared.override_date,
            original_day: prepared.original_day,
            original_time_slot: prepared.original_time_slot,
            change: prepared.change,
            permanent: prepared.permanent,
            created_at: Utc::now(),
        };
        state.overrides.insert(record.id, record.clone());
        if let Some(updated) = prepared.updated_entry {
            state.entries.insert(updated.id, updated);
        }

        Ok(record)
    }

    async fn clear_all(&self) -> Result<ClearSummary, StoreError> {
        let mut state = self.state.write().await;
        let summary = ClearSummary {
            sections: state.sections.len() as u64,
            entries: state.entries.len() as u64,
            overrides: state.overrides.len() as u64,
        };
        state.sections.clear();
        state.entries.clear();
        state.overrides.clear();
        Ok(summary)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
