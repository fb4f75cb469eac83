//! Repository for the `schedule_entries` table.

use sqlx::PgExecutor;
use timetable_core::schedule::{NewScheduleEntry, ScheduleEntry};
use timetable_core::types::DbId;

use crate::models::schedule::{day_column, hour_column, ScheduleEntryRow};

/// Column list for entry queries, joined with the owning section.
const COLUMNS: &str = "e.id, e.section_id, s.name AS section_name, e.course_name, \
                       e.faculty_name, e.room_name, e.day, e.hour";

const FROM: &str = "schedule_entries e JOIN sections s ON s.id = e.section_id";

pub struct ScheduleEntryRepo;

impl ScheduleEntryRepo {
    /// All entries, ordered by section name, day and hour.
    pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<ScheduleEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} ORDER BY s.name, e.day, e.hour");
        sqlx::query_as::<_, ScheduleEntryRow>(&query).fetch_all(db).await
    }

    pub async fn find_by_id<'e>(
        db: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ScheduleEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE e.id = $1");
        sqlx::query_as::<_, ScheduleEntryRow>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_by_section<'e>(
        db: impl PgExecutor<'e>,
        section_id: DbId,
    ) -> Result<Vec<ScheduleEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE e.section_id = $1 ORDER BY e.day, e.hour"
        );
        sqlx::query_as::<_, ScheduleEntryRow>(&query)
            .bind(section_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_by_faculty<'e>(
        db: impl PgExecutor<'e>,
        faculty_name: &str,
    ) -> Result<Vec<ScheduleEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE e.faculty_name = $1 ORDER BY e.day, e.hour, s.name"
        );
        sqlx::query_as::<_, ScheduleEntryRow>(&query)
            .bind(faculty_name)
            .fetch_all(db)
            .await
    }

    /// Insert one entry, returning its new id.
    pub async fn insert<'e>(
        db: impl PgExecutor<'e>,
        section_id: DbId,
        entry: &NewScheduleEntry,
    ) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO schedule_entries \
                (section_id, course_name, faculty_name, room_name, day, hour) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(section_id)
        .bind(&entry.course)
        .bind(&entry.faculty)
        .bind(&entry.room)
        .bind(day_column(entry.day))
        .bind(hour_column(entry.slot))
        .fetch_one(db)
        .await?;
        Ok(id)
    }

    /// Rewrite the teacher, room and placement of a weekly entry.
    /// Returns `true` if a row was updated.
    pub async fn update_placement<'e>(
        db: impl PgExecutor<'e>,
        entry: &ScheduleEntry,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE schedule_entries \
             SET faculty_name = $2, room_name = $3, day = $4, hour = $5 \
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(&entry.faculty)
        .bind(&entry.room)
        .bind(day_column(entry.day))
        .bind(hour_column(entry.slot))
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry of a section; overrides go with them.
    pub async fn delete_by_section<'e>(
        db: impl PgExecutor<'e>,
        section_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_entries WHERE section_id = $1")
            .bind(section_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all<'e>(db: impl PgExecutor<'e>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_entries").execute(db).await?;
        Ok(result.rows_affected())
    }
}
