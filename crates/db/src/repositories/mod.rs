//! Zero-sized repositories over the schedule tables.
//!
//! Every method takes any PostgreSQL executor, so the same query runs on the
//! pool or inside a transaction (`&mut *tx`).

pub mod schedule_entry_repo;
pub mod schedule_override_repo;
pub mod section_repo;

pub use schedule_entry_repo::ScheduleEntryRepo;
pub use schedule_override_repo::ScheduleOverrideRepo;
pub use section_repo::SectionRepo;
