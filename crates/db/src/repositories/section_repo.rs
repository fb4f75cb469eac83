//! Repository for the `sections` table.

use sqlx::PgExecutor;
use timetable_core::types::DbId;

use crate::models::schedule::SectionRow;

/// Column list for sections queries.
const COLUMNS: &str = "id, name, created_at, updated_at";

pub struct SectionRepo;

impl SectionRepo {
    /// List all sections, ordered by name.
    pub async fn list<'e>(db: impl PgExecutor<'e>) -> Result<Vec<SectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sections ORDER BY name ASC");
        sqlx::query_as::<_, SectionRow>(&query).fetch_all(db).await
    }

    pub async fn find_by_name<'e>(
        db: impl PgExecutor<'e>,
        name: &str,
    ) -> Result<Option<SectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sections WHERE name = $1");
        sqlx::query_as::<_, SectionRow>(&query)
            .bind(name)
            .fetch_optional(db)
            .await
    }

    pub async fn create<'e>(db: impl PgExecutor<'e>, name: &str) -> Result<SectionRow, sqlx::Error> {
        let query = format!("INSERT INTO sections (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, SectionRow>(&query)
            .bind(name)
            .fetch_one(db)
            .await
    }

    /// Touch `updated_at` after the section's entries were replaced.
    pub async fn touch<'e>(db: impl PgExecutor<'e>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sections SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Delete a section and, through the cascade, its entries and overrides.
    /// Returns `true` if a row was deleted.
    pub async fn delete_by_name<'e>(db: impl PgExecutor<'e>, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sections WHERE name = $1")
            .bind(name)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all<'e>(db: impl PgExecutor<'e>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sections").execute(db).await?;
        Ok(result.rows_affected())
    }
}
