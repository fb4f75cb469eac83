//! Row types for the schedule tables and their conversion into engine types.

pub mod schedule;
