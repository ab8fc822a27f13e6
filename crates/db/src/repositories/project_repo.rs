//! Repository for the `projects` table.

use sqlx::PgPool;

use gradus_core::types::DbId;

use crate::models::feedback::CreateFeedback;
use crate::models::project::{CreateProject, Project};
use crate::repositories::feedback_repo::FeedbackRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code, title, description, owner_id, status, priority, \
     submitted_at, estimated_completion, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project in `draft`, returning the created row.
    ///
    /// If `priority` is `None` in the input, defaults to `medium`.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (code, title, description, owner_id, priority, estimated_completion) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'medium'), $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.code)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.owner_id)
            .bind(&input.priority)
            .bind(input.estimated_completion)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a project by its human-readable code.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE code = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Mark a project as formally submitted. Returns `false` when the
    /// project was already submitted (the timestamp is kept).
    pub async fn mark_submitted(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET submitted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND submitted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the recomputed derived status.
    ///
    /// Compare-and-set on the previous value: returns `false` when another
    /// writer got there first, in which case the caller re-derives.
    pub async fn store_derived_status(
        pool: &PgPool,
        id: DbId,
        previous: &str,
        derived: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(previous)
        .bind(derived)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unconditionally overwrite the status (administrative override only).
    /// The override and its audit feedback entry commit together so the
    /// ledger never misses a forced status.
    pub async fn force_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
        audit: &CreateFeedback,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE projects SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        FeedbackRepo::append_inner(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Projects whose estimated completion date is within `days` days and
    /// whose review is still open (not approved/rejected).
    pub async fn list_nearing_deadline(
        pool: &PgPool,
        days: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE estimated_completion IS NOT NULL \
               AND estimated_completion <= CURRENT_DATE + $1::bigint \
               AND status NOT IN ('approved', 'rejected') \
             ORDER BY estimated_completion ASC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(days)
            .fetch_all(pool)
            .await
    }

    /// Permanently delete a project. Stages, feedback, documents and
    /// notifications cascade via foreign keys. Returns `true` if a row was
    /// removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
