use std::sync::Arc;

use timetable_core::calendar::WorkingWeek;
use timetable_db::store::ScheduleStore;

use crate::config::ServerConfig;
use crate::locks::SectionLocks;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// Section schedules and overrides (PostgreSQL or in-memory).
    pub store: Arc<dyn ScheduleStore>,
    /// Server configuration (timeouts and search budget used by handlers).
    pub config: Arc<ServerConfig>,
    /// Serializes writes touching the same section.
    pub section_locks: Arc<SectionLocks>,
    /// Days and hours schedules are laid out on.
    pub week: WorkingWeek,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            section_locks: Arc::new(SectionLocks::default()),
            week: WorkingWeek::default(),
        }
    }
}
