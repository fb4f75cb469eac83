//! Input normalization for generation and seating runs.
//!
//! Every function trims names, rejects malformed records with a
//! [`CoreError::Validation`] naming the offending field, and preserves
//! submission order (the scheduler's tie-breaks depend on it).

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Upper bound on weekly hours for a single course (the whole default week).
pub const MAX_WEEKLY_HOURS: i64 = 45;

/// Maximum length of a section name.
pub const MAX_SECTION_NAME_LEN: usize = 64;

/// Largest row or column count accepted for an exam room.
pub const MAX_ROOM_DIMENSION: i64 = 200;

/// Longest leave window the resolver will scan, in days.
pub const MAX_LEAVE_SPAN_DAYS: i64 = 92;

// ---------------------------------------------------------------------------
// Courses and lecture rooms
// ---------------------------------------------------------------------------

/// A course as submitted by the timetable form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseInput {
    pub name: String,
    pub hours: i64,
    pub faculty: String,
}

/// A validated course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    pub hours: u32,
    pub faculty: String,
}

pub fn normalize_courses(raw: &[CourseInput]) -> Result<Vec<Course>, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::invalid("courses", "at least one course is required"));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut courses = Vec::with_capacity(raw.len());

    for (i, input) in raw.iter().enumerate() {
        let name = non_empty(&input.name, || format!("courses[{i}].name"))?;
        let faculty = non_empty(&input.faculty, || format!("courses[{i}].faculty"))?;

        if input.hours <= 0 {
            return Err(CoreError::invalid(
                format!("courses[{i}].hours"),
                "must be a positive integer",
            ));
        }
        if input.hours > MAX_WEEKLY_HOURS {
            return Err(CoreError::invalid(
                format!("courses[{i}].hours"),
                format!("must not exceed {MAX_WEEKLY_HOURS}"),
            ));
        }

        if !seen.insert(name.clone()) {
            return Err(CoreError::invalid(
                format!("courses[{i}].name"),
                format!("duplicate course \"{name}\""),
            ));
        }

        courses.push(Course {
            name,
            // Bounded by MAX_WEEKLY_HOURS above.
            hours: input.hours as u32,
            faculty,
        });
    }

    Ok(courses)
}

pub fn normalize_rooms(raw: &[String]) -> Result<Vec<String>, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::invalid("rooms", "at least one room is required"));
    }
    let mut seen = HashSet::with_capacity(raw.len());
    let mut rooms = Vec::with_capacity(raw.len());
    for (i, room) in raw.iter().enumerate() {
        let name = non_empty(room, || format!("rooms[{i}]"))?;
        if !seen.insert(name.clone()) {
            return Err(CoreError::invalid(
                format!("rooms[{i}]"),
                format!("duplicate room \"{name}\""),
            ));
        }
        rooms.push(name);
    }
    Ok(rooms)
}

// ---------------------------------------------------------------------------
// Students and exam rooms
// ---------------------------------------------------------------------------

/// A student record; also the canonical form once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Student {
    pub roll_no: String,
    pub name: String,
    pub branch: String,
}

/// An exam hall as submitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExamRoomInput {
    pub name: String,
    pub rows: i64,
    pub cols: i64,
}

/// A validated exam hall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRoom {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
}

impl ExamRoom {
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }
}

pub fn normalize_students(raw: &[Student]) -> Result<Vec<Student>, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::invalid("students", "at least one student is required"));
    }

    let mut rolls = HashSet::with_capacity(raw.len());
    let mut students = Vec::with_capacity(raw.len());

    for (i, s) in raw.iter().enumerate() {
        let roll_no = non_empty(&s.roll_no, || format!("students[{i}].roll_no"))?;
        let name = non_empty(&s.name, || format!("students[{i}].name"))?;
        let branch = non_empty(&s.branch, || format!("students[{i}].branch"))?;
        if !rolls.insert(roll_no.clone()) {
            return Err(CoreError::invalid(
                format!("students[{i}].roll_no"),
                format!("duplicate roll number \"{roll_no}\""),
            ));
        }
        students.push(Student {
            roll_no,
            name,
            branch,
        });
    }

    Ok(students)
}

pub fn normalize_exam_rooms(raw: &[ExamRoomInput]) -> Result<Vec<ExamRoom>, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::invalid("rooms", "at least one room is required"));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut rooms = Vec::with_capacity(raw.len());

    for (i, r) in raw.iter().enumerate() {
        let name = non_empty(&r.name, || format!("rooms[{i}].name"))?;
        if !seen.insert(name.clone()) {
            return Err(CoreError::invalid(
                format!("rooms[{i}].name"),
                format!("duplicate room \"{name}\""),
            ));
        }
        let rows = dimension(r.rows, || format!("rooms[{i}].rows"))?;
        let cols = dimension(r.cols, || format!("rooms[{i}].cols"))?;
        rooms.push(ExamRoom { name, rows, cols });
    }

    Ok(rooms)
}

// ---------------------------------------------------------------------------
// Sections and leave windows
// ---------------------------------------------------------------------------

pub fn normalize_section_name(raw: &str) -> Result<String, CoreError> {
    let name = non_empty(raw, || "sectionName".to_string())?;
    if name.chars().count() > MAX_SECTION_NAME_LEN {
        return Err(CoreError::invalid(
            "sectionName",
            format!("must not exceed {MAX_SECTION_NAME_LEN} characters"),
        ));
    }
    Ok(name)
}

/// A faculty absence window, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaveRequest {
    pub teacher_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

pub fn normalize_leave_request(raw: &LeaveRequest) -> Result<LeaveRequest, CoreError> {
    let teacher_name = non_empty(&raw.teacher_name, || "teacher_name".to_string())?;
    if raw.end_date < raw.start_date {
        return Err(CoreError::invalid(
            "end_date",
            "must not be before start_date",
        ));
    }
    let span = (raw.end_date - raw.start_date).num_days() + 1;
    if span > MAX_LEAVE_SPAN_DAYS {
        return Err(CoreError::invalid(
            "end_date",
            format!("leave window spans {span} days, the maximum is {MAX_LEAVE_SPAN_DAYS}"),
        ));
    }
    Ok(LeaveRequest {
        teacher_name,
        start_date: raw.start_date,
        end_date: raw.end_date,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(value: &str, field: impl FnOnce() -> String) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid(field(), "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn dimension(value: i64, field: impl FnOnce() -> String) -> Result<usize, CoreError> {
    if !(1..=MAX_ROOM_DIMENSION).contains(&value) {
        return Err(CoreError::invalid(
            field(),
            format!("must be between 1 and {MAX_ROOM_DIMENSION}"),
        ));
    }
    Ok(value as usize)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
