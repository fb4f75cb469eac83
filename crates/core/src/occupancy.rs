//! Who and what is busy at each (day, slot).
//!
//! Built from stored entries, optionally with the overrides of one calendar
//! week layered on top. Each reservation remembers the section holding it so
//! conflicts can be reported by name.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::calendar::{week_start, Day, TimeSlot};
use crate::schedule::{OverrideChange, OverrideRecord, ScheduleEntry};

type SlotKey = (Day, TimeSlot);

/// Faculty, room and section reservations for one week.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    faculty: HashMap<SlotKey, HashMap<String, String>>,
    rooms: HashMap<SlotKey, HashMap<String, String>>,
    sections: HashMap<SlotKey, HashMap<String, String>>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recurring weekly occupancy of `entries`, ignoring overrides.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ScheduleEntry>) -> Self {
        let mut occupancy = Self::new();
        for e in entries {
            occupancy.reserve_entry(e.day, e.slot, &e.section, &e.faculty, &e.room);
        }
        occupancy
    }

    /// Occupancy of the calendar week containing `date`, with that week's
    /// overrides applied: substitutes take the slot instead of the original
    /// teacher, rescheduled sessions move to their new day, slot and room.
    pub fn for_week<'a>(
        entries: impl IntoIterator<Item = &'a ScheduleEntry>,
        overrides: &[OverrideRecord],
        date: NaiveDate,
    ) -> Self {
        let monday = week_start(date);
        let in_week: HashMap<_, _> = overrides
            .iter()
            .filter(|o| week_start(o.override_date) == monday)
            .map(|o| (o.original_entry_id, &o.change))
            .collect();

        let mut occupancy = Self::new();
        for e in entries {
            match in_week.get(&e.id) {
                None => occupancy.reserve_entry(e.day, e.slot, &e.section, &e.faculty, &e.room),
                Some(OverrideChange::Substitute { new_teacher }) => {
                    occupancy.reserve_entry(e.day, e.slot, &e.section, new_teacher, &e.room);
                }
                Some(OverrideChange::Reschedule {
                    new_day,
                    new_time_slot,
                    new_room,
                }) => occupancy.reserve_entry(
                    *new_day,
                    *new_time_slot,
                    &e.section,
                    &e.faculty,
                    new_room,
                ),
            }
        }
        occupancy
    }

    pub fn reserve_entry(&mut self, day: Day, slot: TimeSlot, section: &str, faculty: &str, room: &str) {
        self.reserve_faculty(day, slot, faculty, section);
        self.reserve_room(day, slot, room, section);
        self.sections
            .entry((day, slot))
            .or_default()
            .insert(section.to_string(), section.to_string());
    }

    pub fn reserve_faculty(&mut self, day: Day, slot: TimeSlot, faculty: &str, holder: &str) {
        self.faculty
            .entry((day, slot))
            .or_default()
            .insert(faculty.to_string(), holder.to_string());
    }

    pub fn reserve_room(&mut self, day: Day, slot: TimeSlot, room: &str, holder: &str) {
        self.rooms
            .entry((day, slot))
            .or_default()
            .insert(room.to_string(), holder.to_string());
    }

    pub fn release_faculty(&mut self, day: Day, slot: TimeSlot, faculty: &str) {
        if let Some(held) = self.faculty.get_mut(&(day, slot)) {
            held.remove(faculty);
        }
    }

    pub fn release_room(&mut self, day: Day, slot: TimeSlot, room: &str) {
        if let Some(held) = self.rooms.get_mut(&(day, slot)) {
            held.remove(room);
        }
    }

    /// Section currently holding `faculty` at (day, slot), if any.
    pub fn faculty_holder(&self, day: Day, slot: TimeSlot, faculty: &str) -> Option<&str> {
        holder(&self.faculty, day, slot, faculty)
    }

    pub fn room_holder(&self, day: Day, slot: TimeSlot, room: &str) -> Option<&str> {
        holder(&self.rooms, day, slot, room)
    }

    pub fn is_faculty_free(&self, day: Day, slot: TimeSlot, faculty: &str) -> bool {
        self.faculty_holder(day, slot, faculty).is_none()
    }

    pub fn is_room_free(&self, day: Day, slot: TimeSlot, room: &str) -> bool {
        self.room_holder(day, slot, room).is_none()
    }

    pub fn is_section_free(&self, day: Day, slot: TimeSlot, section: &str) -> bool {
        holder(&self.sections, day, slot, section).is_none()
    }
}

fn holder<'a>(
    map: &'a HashMap<SlotKey, HashMap<String, String>>,
    day: Day,
    slot: TimeSlot,
    name: &str,
) -> Option<&'a str> {
    map.get(&(day, slot))
        .and_then(|held| held.get(name))
        .map(String::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
