//! PostgreSQL-backed store.
//!
//! Writes run in a transaction holding a transaction-scoped advisory lock, so
//! the cross-section checks of a save or an apply see a stable snapshot.
//!
//! The lock is a single key for the whole schedule, not one per section.
//! Double booking and substitute availability are checked against every
//! section's entries, so two writes to different sections can invalidate
//! each other and must be serialized globally. The per-section locks in the
//! API only order requests within one process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use timetable_core::adjustment::{ApplyRequest, Resolver};
use timetable_core::calendar::WorkingWeek;
use timetable_core::error::CoreError;
use timetable_core::schedule::{NewScheduleEntry, OverrideRecord, ScheduleEntry};
use timetable_core::types::DbId;

use super::{
    check_double_booking, group_by_section, view_for_date, ClearSummary, DateView, SaveOutcome,
    ScheduleStore, StoreError,
};
use crate::models::schedule::{NewOverrideRow, ScheduleEntryRow, ScheduleOverrideRow};
use crate::repositories::{ScheduleEntryRepo, ScheduleOverrideRepo, SectionRepo};

/// Advisory lock key serializing schedule writes.
const SCHEDULE_WRITE_LOCK: i64 = 0x5c4e_d01e;

/// Unique constraint guarding one override per entry and date.
const UQ_OVERRIDE_ENTRY_DATE: &str = "uq_schedule_overrides_entry_date";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn lock_schedule(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEDULE_WRITE_LOCK)
        .execute(conn)
        .await?;
    Ok(())
}

fn to_entries(rows: Vec<ScheduleEntryRow>) -> Result<Vec<ScheduleEntry>, StoreError> {
    rows.into_iter()
        .map(|r| ScheduleEntry::try_from(r).map_err(StoreError::from))
        .collect()
}

fn to_overrides(rows: Vec<ScheduleOverrideRow>) -> Result<Vec<OverrideRecord>, StoreError> {
    rows.into_iter()
        .map(|r| OverrideRecord::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn save_section(
        &self,
        section: &str,
        entries: &[NewScheduleEntry],
        overwrite: bool,
    ) -> Result<SaveOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_schedule(&mut tx).await?;

        let existing = SectionRepo::find_by_name(&mut *tx, section).await?;
        if existing.is_some() && !overwrite {
            return Err(CoreError::DuplicateSection(section.to_string()).into());
        }

        let stored = to_entries(ScheduleEntryRepo::list_all(&mut *tx).await?)?;
        check_double_booking(section, entries, &stored)?;

        let (section_id, outcome) = match existing {
            Some(row) => {
                let removed = ScheduleEntryRepo::delete_by_section(&mut *tx, row.id).await?;
                SectionRepo::touch(&mut *tx, row.id).await?;
                tracing::debug!(section, removed, "Replacing section schedule");
                (row.id, SaveOutcome::Replaced)
            }
            None => (SectionRepo::create(&mut *tx, section).await?.id, SaveOutcome::Created),
        };

        for e in entries {
            ScheduleEntryRepo::insert(&mut *tx, section_id, e).await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Vec<ScheduleEntry>>, StoreError> {
        let sections = SectionRepo::list(&self.pool).await?;
        let mut grouped = group_by_section(to_entries(ScheduleEntryRepo::list_all(&self.pool).await?)?);
        for s in sections {
            grouped.entry(s.name).or_default();
        }
        Ok(grouped)
    }

    async fn all_entries(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        to_entries(ScheduleEntryRepo::list_all(&self.pool).await?)
    }

    async fn all_overrides(&self) -> Result<Vec<OverrideRecord>, StoreError> {
        to_overrides(ScheduleOverrideRepo::list_all(&self.pool).await?)
    }

    async fn find_entry(&self, id: DbId) -> Result<Option<ScheduleEntry>, StoreError> {
        ScheduleEntryRepo::find_by_id(&self.pool, id)
            .await?
            .map(ScheduleEntry::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn delete_section(&self, section: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_schedule(&mut tx).await?;
        if !SectionRepo::delete_by_name(&mut *tx, section).await? {
            return Err(CoreError::not_found("Section", section).into());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn view_on_date(&self, section: &str, date: NaiveDate) -> Result<DateView, StoreError> {
        let row = SectionRepo::find_by_name(&self.pool, section)
            .await?
            .ok_or_else(|| CoreError::not_found("Section", section))?;
        let entries = to_entries(ScheduleEntryRepo::list_by_section(&self.pool, row.id).await?)?;
        let overrides = to_overrides(ScheduleOverrideRepo::list_all(&self.pool).await?)?;
        Ok(view_for_date(&row.name, date, &entries, &overrides))
    }

    async fn entries_for_faculty(&self, faculty: &str) -> Result<Vec<ScheduleEntry>, StoreError> {
        to_entries(ScheduleEntryRepo::list_by_faculty(&self.pool, faculty).await?)
    }

    async fn apply_solution(
        &self,
        request: &ApplyRequest,
        week: &WorkingWeek,
    ) -> Result<OverrideRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_schedule(&mut tx).await?;

        let entries = to_entries(ScheduleEntryRepo::list_all(&mut *tx).await?)?;
        let overrides = to_overrides(ScheduleOverrideRepo::list_all(&mut *tx).await?)?;
        let mut resolver = Resolver::new(&entries, &overrides).with_week(*week);
        let prepared = resolver.apply(request)?;

        let row = NewOverrideRow::new(&prepared);
        let created = match ScheduleOverrideRepo::create(&mut *tx, &row).await {
            Ok(created) => created,
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some(UQ_OVERRIDE_ENTRY_DATE) =>
            {
                return Err(CoreError::ConflictAlreadyResolved {
                    entry_id: prepared.original_entry_id,
                    date: prepared.override_date,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(updated) = &prepared.updated_entry {
            ScheduleEntryRepo::update_placement(&mut *tx, updated).await?;
        }

        tx.commit().await?;
        Ok(OverrideRecord::try_from(created)?)
    }

    async fn clear_all(&self) -> Result<ClearSummary, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_schedule(&mut tx).await?;
        let overrides = ScheduleOverrideRepo::delete_all(&mut *tx).await?;
        let entries = ScheduleEntryRepo::delete_all(&mut *tx).await?;
        let sections = SectionRepo::delete_all(&mut *tx).await?;
        tx.commit().await?;
        Ok(ClearSummary {
            sections,
            entries,
            overrides,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
