//! Leave-driven schedule adjustments.
//!
//! When a faculty member is on leave, every class they would teach inside the
//! leave window is an affected occurrence. The [`Resolver`] finds those
//! occurrences, proposes substitutes and reschedule slots for each, and
//! validates a chosen solution into an override the store can commit.
//!
//! Proposals and applies are evaluated against the effective occupancy of
//! the calendar week in question: the weekly entries with that week's
//! overrides layered on top.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{date_in_week, week_start, Day, TimeSlot, WorkingWeek};
use crate::error::CoreError;
use crate::normalize::LeaveRequest;
use crate::occupancy::Occupancy;
use crate::schedule::{ChangeType, OverrideChange, OverrideRecord, ScheduleEntry};
use crate::types::DbId;

/// Reschedule options offered per affected occurrence.
pub const MAX_RESCHEDULE_OPTIONS: usize = 3;

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

/// Where a resolver is in the scan → propose → apply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AdjustmentPhase {
    Idle,
    Scanning,
    Proposing,
    AwaitingSelection,
    Applying,
    Done,
}

impl AdjustmentPhase {
    pub fn name(self) -> &'static str {
        match self {
            AdjustmentPhase::Idle => "Idle",
            AdjustmentPhase::Scanning => "Scanning",
            AdjustmentPhase::Proposing => "Proposing",
            AdjustmentPhase::AwaitingSelection => "AwaitingSelection",
            AdjustmentPhase::Applying => "Applying",
            AdjustmentPhase::Done => "Done",
        }
    }
}

pub mod state_machine {
    use super::AdjustmentPhase::{self, *};

    /// Phases reachable from `from`. `Done` is terminal.
    ///
    /// A selection made against an earlier proposal can be applied by a
    /// fresh resolver, hence `Idle -> Applying`. A rejected apply returns to
    /// `AwaitingSelection` so another solution can be tried.
    pub fn valid_transitions(from: AdjustmentPhase) -> &'static [AdjustmentPhase] {
        match from {
            Idle => &[Scanning, Applying],
            // Nothing affected: straight to Done.
            Scanning => &[Proposing, Done],
            Proposing => &[AwaitingSelection],
            AwaitingSelection => &[Applying, Done],
            Applying => &[Done, AwaitingSelection],
            Done => &[],
        }
    }

    pub fn can_transition(from: AdjustmentPhase, to: AdjustmentPhase) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a phase transition, returning an error message for invalid ones.
    pub fn validate_transition(from: AdjustmentPhase, to: AdjustmentPhase) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid adjustment transition: {} -> {}",
                from.name(),
                to.name()
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// One proposed (or chosen) fix for an affected occurrence.
///
/// Proposals always carry `override_date` and the fields for their type;
/// when a client sends one back, missing fields are rejected by
/// [`Solution::change`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub override_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_day: Option<Day>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_time_slot: Option<TimeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_room: Option<String>,
}

impl Solution {
    pub fn substitute(date: NaiveDate, teacher: &str) -> Self {
        Self {
            kind: ChangeType::Substitute,
            details: format!("Assign {teacher}"),
            override_date: Some(date),
            new_teacher: Some(teacher.to_string()),
            new_day: None,
            new_time_slot: None,
            new_room: None,
        }
    }

    pub fn reschedule(date: NaiveDate, day: Day, slot: TimeSlot, room: &str) -> Self {
        Self {
            kind: ChangeType::Reschedule,
            details: format!("Move to {day}, {slot} in {room}"),
            override_date: Some(date),
            new_teacher: None,
            new_day: Some(day),
            new_time_slot: Some(slot),
            new_room: Some(room.to_string()),
        }
    }

    /// The override change this solution describes.
    pub fn change(&self) -> Result<OverrideChange, CoreError> {
        match self.kind {
            ChangeType::Substitute => Ok(OverrideChange::Substitute {
                new_teacher: required_text(self.new_teacher.as_deref(), "solution.new_teacher")?,
            }),
            ChangeType::Reschedule => Ok(OverrideChange::Reschedule {
                new_day: self
                    .new_day
                    .ok_or_else(|| CoreError::invalid("solution.new_day", "is required"))?,
                new_time_slot: self
                    .new_time_slot
                    .ok_or_else(|| CoreError::invalid("solution.new_time_slot", "is required"))?,
                new_room: required_text(self.new_room.as_deref(), "solution.new_room")?,
            }),
        }
    }
}

fn required_text(value: Option<&str>, field: &str) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::invalid(field, "is required")),
    }
}

/// An affected occurrence with its proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// e.g. `Math (CS-A) on Monday at 9:00 AM`
    pub original_class: String,
    pub conflict_entry_id: DbId,
    pub section_name: String,
    pub date: NaiveDate,
    /// An override already exists for this occurrence; no solutions offered.
    pub resolved: bool,
    pub solutions: Vec<Solution>,
}

/// A weekly entry falling on a date inside the leave window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedClass {
    pub entry: ScheduleEntry,
    pub date: NaiveDate,
}

/// A selection to validate and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub entry_id: DbId,
    pub solution: Solution,
    /// Also rewrite the weekly entry, not just this occurrence.
    pub persist_permanently: bool,
}

/// A validated override, ready for the store to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOverride {
    pub original_entry_id: DbId,
    pub override_date: NaiveDate,
    /// Placement of the entry before this change.
    pub original_day: Day,
    pub original_time_slot: TimeSlot,
    pub change: OverrideChange,
    pub permanent: bool,
    /// The rewritten weekly entry when the change is permanent.
    pub updated_entry: Option<ScheduleEntry>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Scans, proposes and validates adjustments over a snapshot of the store.
#[derive(Debug)]
pub struct Resolver<'a> {
    entries: &'a [ScheduleEntry],
    overrides: &'a [OverrideRecord],
    week: WorkingWeek,
    phase: AdjustmentPhase,
}

impl<'a> Resolver<'a> {
    pub fn new(entries: &'a [ScheduleEntry], overrides: &'a [OverrideRecord]) -> Self {
        Self {
            entries,
            overrides,
            week: WorkingWeek::default(),
            phase: AdjustmentPhase::Idle,
        }
    }

    pub fn with_week(mut self, week: WorkingWeek) -> Self {
        self.week = week;
        self
    }

    pub fn phase(&self) -> AdjustmentPhase {
        self.phase
    }

    fn transition(&mut self, to: AdjustmentPhase) -> Result<(), CoreError> {
        state_machine::validate_transition(self.phase, to).map_err(CoreError::Internal)?;
        self.phase = to;
        Ok(())
    }

    /// Scan and propose in one go.
    pub fn find_solutions(&mut self, leave: &LeaveRequest) -> Result<Vec<Conflict>, CoreError> {
        let affected = self.scan(leave)?;
        if affected.is_empty() {
            return Ok(Vec::new());
        }
        self.propose(leave, &affected)
    }

    /// Every (entry, date) the faculty on leave would teach inside the leave
    /// window, ordered by date then slot.
    ///
    /// A faculty member with no weekly entries at all is unknown.
    pub fn scan(&mut self, leave: &LeaveRequest) -> Result<Vec<AffectedClass>, CoreError> {
        self.transition(AdjustmentPhase::Scanning)?;

        let teaching: Vec<&ScheduleEntry> = self
            .entries
            .iter()
            .filter(|e| e.faculty == leave.teacher_name)
            .collect();
        if teaching.is_empty() {
            return Err(CoreError::not_found("Faculty", &leave.teacher_name));
        }

        let mut affected = Vec::new();
        for date in leave.start_date.iter_days().take_while(|d| *d <= leave.end_date) {
            let Some(day) = Day::of_date(date) else { continue };
            let mut that_day: Vec<_> = teaching.iter().filter(|e| e.day == day).collect();
            that_day.sort_by(|a, b| (a.slot, &a.section).cmp(&(b.slot, &b.section)));
            affected.extend(that_day.into_iter().map(|e| AffectedClass {
                entry: (*e).clone(),
                date,
            }));
        }

        if affected.is_empty() {
            self.transition(AdjustmentPhase::Done)?;
        }
        Ok(affected)
    }

    /// Build substitute and reschedule proposals for each affected occurrence.
    pub fn propose(
        &mut self,
        leave: &LeaveRequest,
        affected: &[AffectedClass],
    ) -> Result<Vec<Conflict>, CoreError> {
        self.transition(AdjustmentPhase::Proposing)?;

        let faculty: BTreeSet<&str> = self.entries.iter().map(|e| e.faculty.as_str()).collect();
        let rooms: BTreeSet<&str> = self.entries.iter().map(|e| e.room.as_str()).collect();
        let resolved: HashSet<(DbId, NaiveDate)> = self
            .overrides
            .iter()
            .map(|o| (o.original_entry_id, o.override_date))
            .collect();

        let conflicts = affected
            .iter()
            .map(|a| {
                let is_resolved = resolved.contains(&(a.entry.id, a.date));
                let solutions = if is_resolved {
                    Vec::new()
                } else {
                    let occupancy = Occupancy::for_week(self.entries, self.overrides, a.date);
                    let mut solutions = self.substitutes(a, leave, &faculty, &occupancy);
                    solutions.extend(self.reschedules(a, leave, &rooms, &occupancy));
                    solutions
                };
                Conflict {
                    original_class: a.entry.describe(),
                    conflict_entry_id: a.entry.id,
                    section_name: a.entry.section.clone(),
                    date: a.date,
                    resolved: is_resolved,
                    solutions,
                }
            })
            .collect();

        self.transition(AdjustmentPhase::AwaitingSelection)?;
        Ok(conflicts)
    }

    /// Free faculty for the occurrence: those already teaching the same
    /// course first, then everyone else, each group alphabetical.
    fn substitutes(
        &self,
        affected: &AffectedClass,
        leave: &LeaveRequest,
        faculty: &BTreeSet<&str>,
        occupancy: &Occupancy,
    ) -> Vec<Solution> {
        let entry = &affected.entry;
        let qualified: HashSet<&str> = self
            .entries
            .iter()
            .filter(|e| e.course == entry.course)
            .map(|e| e.faculty.as_str())
            .collect();

        let mut free: Vec<&str> = faculty
            .iter()
            .copied()
            .filter(|f| *f != leave.teacher_name && *f != entry.faculty)
            .filter(|f| occupancy.is_faculty_free(entry.day, entry.slot, f))
            .collect();
        // Stable sort keeps alphabetical order within each group.
        free.sort_by_key(|f| !qualified.contains(f));

        free.into_iter()
            .map(|f| Solution::substitute(affected.date, f))
            .collect()
    }

    /// Up to [`MAX_RESCHEDULE_OPTIONS`] free slots in the same week, outside
    /// the leave window, in day/hour order.
    fn reschedules(
        &self,
        affected: &AffectedClass,
        leave: &LeaveRequest,
        rooms: &BTreeSet<&str>,
        occupancy: &Occupancy,
    ) -> Vec<Solution> {
        let entry = &affected.entry;
        let monday = week_start(affected.date);

        self.week
            .slots(false)
            .into_iter()
            .filter(|&(day, slot)| (day, slot) != (entry.day, entry.slot))
            .filter(|&(day, _)| !leave.covers(date_in_week(monday, day)))
            .filter(|&(day, slot)| {
                occupancy.is_section_free(day, slot, &entry.section)
                    && occupancy.is_faculty_free(day, slot, &entry.faculty)
            })
            .filter_map(|(day, slot)| {
                let room = if occupancy.is_room_free(day, slot, &entry.room) {
                    entry.room.as_str()
                } else {
                    rooms
                        .iter()
                        .copied()
                        .find(|r| occupancy.is_room_free(day, slot, r))?
                };
                Some(Solution::reschedule(affected.date, day, slot, room))
            })
            .take(MAX_RESCHEDULE_OPTIONS)
            .collect()
    }

    /// Validate a chosen solution against the snapshot.
    ///
    /// The target must be free in the effective week, ignoring the entry
    /// itself. A permanent change must also be free in the base weekly
    /// schedule.
    pub fn apply(&mut self, request: &ApplyRequest) -> Result<PreparedOverride, CoreError> {
        self.transition(AdjustmentPhase::Applying)?;

        match self.prepare(request) {
            Ok(prepared) => {
                self.transition(AdjustmentPhase::Done)?;
                Ok(prepared)
            }
            Err(e) => {
                self.transition(AdjustmentPhase::AwaitingSelection)?;
                Err(e)
            }
        }
    }

    fn prepare(&self, request: &ApplyRequest) -> Result<PreparedOverride, CoreError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == request.entry_id)
            .ok_or_else(|| CoreError::not_found("Schedule entry", request.entry_id))?;

        let date = request
            .solution
            .override_date
            .ok_or_else(|| CoreError::invalid("solution.override_date", "is required"))?;

        // A permanent change may already have moved the entry off this weekday.
        if self
            .overrides
            .iter()
            .any(|o| o.original_entry_id == entry.id && o.override_date == date)
        {
            return Err(CoreError::ConflictAlreadyResolved {
                entry_id: entry.id,
                date,
            });
        }

        if Day::of_date(date) != Some(entry.day) {
            return Err(CoreError::invalid(
                "solution.override_date",
                format!("{date} is not a {}", entry.day),
            ));
        }

        let change = request.solution.change()?;
        let others: Vec<ScheduleEntry> = self
            .entries
            .iter()
            .filter(|e| e.id != entry.id)
            .cloned()
            .collect();

        let this_week = Occupancy::for_week(&others, self.overrides, date);
        self.check_target(entry, &change, &this_week, "that week")?;

        let updated_entry = if request.persist_permanently {
            let base = Occupancy::from_entries(&others);
            self.check_target(entry, &change, &base, "the weekly schedule")?;
            Some(rewrite_entry(entry, &change))
        } else {
            None
        };

        Ok(PreparedOverride {
            original_entry_id: entry.id,
            override_date: date,
            original_day: entry.day,
            original_time_slot: entry.slot,
            change,
            permanent: request.persist_permanently,
            updated_entry,
        })
    }

    fn check_target(
        &self,
        entry: &ScheduleEntry,
        change: &OverrideChange,
        occupancy: &Occupancy,
        scope: &str,
    ) -> Result<(), CoreError> {
        match change {
            OverrideChange::Substitute { new_teacher } => {
                if *new_teacher == entry.faculty {
                    return Err(CoreError::invalid(
                        "solution.new_teacher",
                        format!("{new_teacher} already teaches this class"),
                    ));
                }
                if let Some(holder) = occupancy.faculty_holder(entry.day, entry.slot, new_teacher) {
                    return Err(CoreError::Conflict(format!(
                        "{new_teacher} already teaches {holder} on {} at {} in {scope}",
                        entry.day, entry.slot
                    )));
                }
            }
            OverrideChange::Reschedule {
                new_day,
                new_time_slot,
                new_room,
            } => {
                let (day, slot) = (*new_day, *new_time_slot);
                if !self.week.contains(slot) {
                    return Err(CoreError::invalid(
                        "solution.new_time_slot",
                        "slot is outside the working day",
                    ));
                }
                if !occupancy.is_section_free(day, slot, &entry.section) {
                    return Err(CoreError::Conflict(format!(
                        "{} already has a class on {day} at {slot} in {scope}",
                        entry.section
                    )));
                }
                if let Some(holder) = occupancy.faculty_holder(day, slot, &entry.faculty) {
                    return Err(CoreError::Conflict(format!(
                        "{} already teaches {holder} on {day} at {slot} in {scope}",
                        entry.faculty
                    )));
                }
                if let Some(holder) = occupancy.room_holder(day, slot, new_room) {
                    return Err(CoreError::Conflict(format!(
                        "Room {new_room} is used by {holder} on {day} at {slot} in {scope}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn rewrite_entry(entry: &ScheduleEntry, change: &OverrideChange) -> ScheduleEntry {
    let mut updated = entry.clone();
    match change {
        OverrideChange::Substitute { new_teacher } => updated.faculty = new_teacher.clone(),
        OverrideChange::Reschedule {
            new_day,
            new_time_slot,
            new_room,
        } => {
            updated.day = *new_day;
            updated.slot = *new_time_slot;
            updated.room = new_room.clone();
        }
    }
    updated
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
