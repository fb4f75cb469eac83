//! Repository for the `schedule_overrides` table.

use sqlx::PgExecutor;

use crate::models::schedule::{NewOverrideRow, ScheduleOverrideRow};

/// Column list for override queries.
const COLUMNS: &str = "id, original_entry_id, override_date, original_day, original_hour, \
                       change_type, new_teacher, new_day, new_hour, new_room, permanent, \
                       created_at";

pub struct ScheduleOverrideRepo;

impl ScheduleOverrideRepo {
    /// All overrides, oldest date first.
    pub async fn list_all<'e>(
        db: impl PgExecutor<'e>,
    ) -> Result<Vec<ScheduleOverrideRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM schedule_overrides ORDER BY override_date, id");
        sqlx::query_as::<_, ScheduleOverrideRow>(&query)
            .fetch_all(db)
            .await
    }

    /// Insert an override, returning the created row.
    ///
    /// A second override for the same entry and date violates
    /// `uq_schedule_overrides_entry_date`.
    pub async fn create<'e>(
        db: impl PgExecutor<'e>,
        input: &NewOverrideRow,
    ) -> Result<ScheduleOverrideRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedule_overrides \
                (original_entry_id, override_date, original_day, original_hour, \
                 change_type, new_teacher, new_day, new_hour, new_room, permanent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScheduleOverrideRow>(&query)
            .bind(input.original_entry_id)
            .bind(input.override_date)
            .bind(input.original_day)
            .bind(input.original_hour)
            .bind(input.change_type)
            .bind(&input.new_teacher)
            .bind(input.new_day)
            .bind(input.new_hour)
            .bind(&input.new_room)
            .bind(input.permanent)
            .fetch_one(db)
            .await
    }

    pub async fn delete_all<'e>(db: impl PgExecutor<'e>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_overrides").execute(db).await?;
        Ok(result.rows_affected())
    }
}
