//! Scheduling engine for the school-administration backend.
//!
//! Everything in this crate is pure logic: input normalization, the weekly
//! timetable scheduler, the exam-seating allocator and the leave-driven
//! adjustment resolver. Persistence lives in `timetable-db`; HTTP lives in
//! `timetable-api`.

pub mod adjustment;
pub mod calendar;
pub mod error;
pub mod normalize;
pub mod occupancy;
pub mod schedule;
pub mod seating;
pub mod timetable;
pub mod types;
