//! Weekly timetable generation for one section.
//!
//! Every course-hour becomes a session on a (day, slot, room) triple. A
//! section attends one session per slot, faculty and rooms are never
//! double-booked (including against schedules already stored for other
//! sections), and a course either receives all of its weekly hours or is
//! reported unplaced.
//!
//! # Algorithm
//!
//! Sessions are expanded from the courses in submission order and placed by
//! depth-first search, trying each session's candidate slots in preference
//! order:
//!
//! 1. fewest sessions of the same course already on that day (day spread),
//! 2. hours the course does not already use on another day,
//! 3. earliest day, then earliest hour.
//!
//! The room is the first free room in submission order. The first path of the
//! search is exactly the greedy assignment; backtracking only kicks in when a
//! later session has nowhere to go. The search is bounded by
//! [`TimetableOptions::max_steps`]; when it fails or runs out of budget the
//! generator falls back to course-by-course greedy placement with
//! all-or-nothing rollback. The result is fully deterministic.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::calendar::{Day, TimeSlot, WorkingWeek};
use crate::normalize::Course;
use crate::occupancy::Occupancy;
use crate::schedule::NewScheduleEntry;
use crate::types::DbId;

/// Default bound on candidate placements tried by the search.
pub const DEFAULT_MAX_STEPS: u64 = 200_000;

/// Holder name used for reservations made by the schedule being generated.
const DRAFT_HOLDER: &str = "(new schedule)";

/// Tuning knobs for a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimetableOptions {
    /// Remove the lunch slot from every day.
    pub include_lunch_break: bool,
    /// Candidate placements the backtracking search may try before giving up.
    pub max_steps: u64,
}

impl Default for TimetableOptions {
    fn default() -> Self {
        Self {
            include_lunch_break: false,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// One filled cell of the generated grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub course_name: String,
    pub faculty_name: String,
    pub room_name: String,
    /// Provisional id, unique within this result. Stored entries get their
    /// own ids when the schedule is saved.
    pub entry_id: DbId,
}

/// Which strategy produced a timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The backtracking search placed every session.
    Search,
    /// Greedy placement; some courses may be unplaced.
    Greedy,
}

/// A generated weekly grid plus the courses that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timetable {
    /// Every working day is present, possibly with no sessions.
    pub schedule: BTreeMap<Day, BTreeMap<TimeSlot, SlotAssignment>>,
    /// Names of courses left out entirely, in submission order.
    pub unplaced: Vec<String>,
    #[serde(skip)]
    pub strategy: Strategy,
}

impl Timetable {
    pub fn session_count(&self) -> usize {
        self.schedule.values().map(BTreeMap::len).sum()
    }

    /// The grid as entries ready to be stored, ordered by day then slot.
    pub fn entries(&self) -> Vec<NewScheduleEntry> {
        self.schedule
            .iter()
            .flat_map(|(day, cells)| {
                cells.iter().map(move |(slot, cell)| NewScheduleEntry {
                    course: cell.course_name.clone(),
                    faculty: cell.faculty_name.clone(),
                    room: cell.room_name.clone(),
                    day: *day,
                    slot: *slot,
                })
            })
            .collect()
    }
}

/// Generate a weekly timetable.
///
/// `busy` holds faculty and rooms already committed elsewhere; it is not
/// modified.
pub fn generate(
    courses: &[Course],
    rooms: &[String],
    busy: &Occupancy,
    week: &WorkingWeek,
    options: &TimetableOptions,
) -> Timetable {
    let slots = week.slots(options.include_lunch_break);
    let sessions: Vec<usize> = courses
        .iter()
        .enumerate()
        .flat_map(|(i, c)| std::iter::repeat(i).take(c.hours as usize))
        .collect();

    // More sessions than grid cells can never be fully placed.
    if sessions.len() <= slots.len() {
        let mut planner = Planner::new(courses, rooms, &slots, busy.clone());
        let mut budget = options.max_steps;
        if planner.search(&sessions, &mut budget) == Search::Solved {
            return planner.into_timetable(Vec::new(), Strategy::Search);
        }
    }

    let mut planner = Planner::new(courses, rooms, &slots, busy.clone());
    let unplaced = planner.place_greedily();
    planner.into_timetable(unplaced, Strategy::Greedy)
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    Solved,
    Failed,
    OutOfBudget,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    course: usize,
    room: usize,
}

struct Planner<'a> {
    courses: &'a [Course],
    rooms: &'a [String],
    slots: &'a [(Day, TimeSlot)],
    occupancy: Occupancy,
    grid: HashMap<(Day, TimeSlot), Placement>,
    day_load: HashMap<(usize, Day), u32>,
    hour_load: HashMap<(usize, TimeSlot), u32>,
}

impl<'a> Planner<'a> {
    fn new(
        courses: &'a [Course],
        rooms: &'a [String],
        slots: &'a [(Day, TimeSlot)],
        occupancy: Occupancy,
    ) -> Self {
        Self {
            courses,
            rooms,
            slots,
            occupancy,
            grid: HashMap::new(),
            day_load: HashMap::new(),
            hour_load: HashMap::new(),
        }
    }

    /// Feasible (day, slot, room) placements for one session of `course`,
    /// best first.
    fn candidates(&self, course: usize) -> Vec<(Day, TimeSlot, usize)> {
        let faculty = &self.courses[course].faculty;

        let mut found: Vec<(usize, Day, TimeSlot, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(order, &(day, slot))| {
                if self.grid.contains_key(&(day, slot))
                    || !self.occupancy.is_faculty_free(day, slot, faculty)
                {
                    return None;
                }
                let room = self
                    .rooms
                    .iter()
                    .position(|r| self.occupancy.is_room_free(day, slot, r))?;
                Some((order, day, slot, room))
            })
            .collect();

        found.sort_by_key(|&(order, day, slot, _)| {
            let on_day = self.day_load.get(&(course, day)).copied().unwrap_or(0);
            let hour_used = self.hour_load.get(&(course, slot)).copied().unwrap_or(0) > 0;
            (on_day, hour_used, order)
        });

        found
            .into_iter()
            .map(|(_, day, slot, room)| (day, slot, room))
            .collect()
    }

    fn place(&mut self, course: usize, day: Day, slot: TimeSlot, room: usize) {
        self.grid.insert((day, slot), Placement { course, room });
        self.occupancy
            .reserve_faculty(day, slot, &self.courses[course].faculty, DRAFT_HOLDER);
        self.occupancy
            .reserve_room(day, slot, &self.rooms[room], DRAFT_HOLDER);
        *self.day_load.entry((course, day)).or_default() += 1;
        *self.hour_load.entry((course, slot)).or_default() += 1;
    }

    fn unplace(&mut self, day: Day, slot: TimeSlot) {
        let Some(Placement { course, room }) = self.grid.remove(&(day, slot)) else {
            return;
        };
        self.occupancy
            .release_faculty(day, slot, &self.courses[course].faculty);
        self.occupancy.release_room(day, slot, &self.rooms[room]);
        if let Some(n) = self.day_load.get_mut(&(course, day)) {
            *n -= 1;
        }
        if let Some(n) = self.hour_load.get_mut(&(course, slot)) {
            *n -= 1;
        }
    }

    /// Depth-first placement of `sessions`, consuming one unit of `budget`
    /// per candidate tried.
    fn search(&mut self, sessions: &[usize], budget: &mut u64) -> Search {
        let Some((&course, rest)) = sessions.split_first() else {
            return Search::Solved;
        };

        for (day, slot, room) in self.candidates(course) {
            if *budget == 0 {
                return Search::OutOfBudget;
            }
            *budget -= 1;

            self.place(course, day, slot, room);
            match self.search(rest, budget) {
                Search::Solved => return Search::Solved,
                Search::OutOfBudget => return Search::OutOfBudget,
                Search::Failed => self.unplace(day, slot),
            }
        }

        Search::Failed
    }

    /// Place courses one at a time, rolling back any course that cannot get
    /// all of its hours. Returns the names of the rolled-back courses.
    fn place_greedily(&mut self) -> Vec<String> {
        let mut unplaced = Vec::new();

        for (idx, course) in self.courses.iter().enumerate() {
            let mut placed = Vec::with_capacity(course.hours as usize);
            for _ in 0..course.hours {
                let Some(&(day, slot, room)) = self.candidates(idx).first() else {
                    break;
                };
                self.place(idx, day, slot, room);
                placed.push((day, slot));
            }

            if placed.len() < course.hours as usize {
                for (day, slot) in placed {
                    self.unplace(day, slot);
                }
                unplaced.push(course.name.clone());
            }
        }

        unplaced
    }

    fn into_timetable(self, unplaced: Vec<String>, strategy: Strategy) -> Timetable {
        let mut schedule: BTreeMap<Day, BTreeMap<TimeSlot, SlotAssignment>> =
            Day::ALL.into_iter().map(|d| (d, BTreeMap::new())).collect();

        let mut cells: Vec<_> = self.grid.into_iter().collect();
        cells.sort_by_key(|((day, slot), _)| (*day, *slot));

        for (n, ((day, slot), placement)) in cells.into_iter().enumerate() {
            let course = &self.courses[placement.course];
            schedule.entry(day).or_default().insert(
                slot,
                SlotAssignment {
                    course_name: course.name.clone(),
                    faculty_name: course.faculty.clone(),
                    room_name: self.rooms[placement.room].clone(),
                    entry_id: n as DbId + 1,
                },
            );
        }

        Timetable {
            schedule,
            unplaced,
            strategy,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
