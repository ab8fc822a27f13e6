//! Repository for the `stages` table.
//!
//! Every status transition is a conditional `UPDATE` guarded by the
//! expected current status. Zero affected rows means the caller raced
//! another writer (or the transition was never legal) and must surface
//! `InvalidStateError` instead of overwriting.

use sqlx::PgPool;

use gradus_core::stage::{PROGRESS_COMPLETE, PROGRESS_REVIEW_BASELINE, PROGRESS_UPLOAD_CAP};
use gradus_core::types::DbId;

use crate::models::feedback::CreateFeedback;
use crate::models::stage::Stage;
use crate::repositories::feedback_repo::FeedbackRepo;

/// Column list for `stages` queries.
const COLUMNS: &str = "id, project_id, area, status, reviewer_id, progress, \
     started_at, due_at, completed_at, created_at, updated_at";

/// Provides persistence for per-area review stages.
pub struct StageRepo;

impl StageRepo {
    /// Bulk-create one `pending` stage per area for a freshly submitted
    /// project. The `(project_id, area)` unique constraint makes a repeat
    /// submission fail loudly rather than duplicate stages.
    pub async fn create_for_submission(
        pool: &PgPool,
        project_id: DbId,
        areas: &[&str],
    ) -> Result<Vec<Stage>, sqlx::Error> {
        let query = format!(
            "INSERT INTO stages (project_id, area) \
             SELECT $1, unnest($2::text[]) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Stage>(&query)
            .bind(project_id)
            .bind(areas)
            .fetch_all(pool)
            .await
    }

    /// Find the stage for a (project, area) pair.
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
    ) -> Result<Option<Stage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stages WHERE project_id = $1 AND area = $2");
        sqlx::query_as::<_, Stage>(&query)
            .bind(project_id)
            .bind(area)
            .fetch_optional(pool)
            .await
    }

    /// List all stages of a project in review-sequence insertion order.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Stage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stages WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Stage>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Set the assigned reviewer. Allowed only while the stage is
    /// `pending` or `in_review`; the status itself is unchanged.
    pub async fn assign_reviewer(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
        reviewer_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stages SET reviewer_id = $3, updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 \
               AND status IN ('pending', 'in_review')",
        )
        .bind(project_id)
        .bind(area)
        .bind(reviewer_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `pending → in_review`: sets the start timestamp and the review
    /// baseline progress. Returns `false` when the stage was not `pending`
    /// (the idempotent already-in-review case is decided by the caller).
    pub async fn start_review(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stages \
             SET status = 'in_review', started_at = NOW(), progress = $3, updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 AND status = 'pending'",
        )
        .bind(project_id)
        .bind(area)
        .bind(PROGRESS_REVIEW_BASELINE)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `in_review → approved`: completion timestamp set, progress 100.
    pub async fn approve(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stages \
             SET status = 'approved', completed_at = NOW(), progress = $3, updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 AND status = 'in_review'",
        )
        .bind(project_id)
        .bind(area)
        .bind(PROGRESS_COMPLETE)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `in_review → rejected`, appending the rejection feedback entry in
    /// the same transaction: a rejected stage without its ledger entry (or
    /// the reverse) must never be observable. When the status guard does
    /// not match, the transaction rolls back and nothing lands.
    pub async fn reject(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
        feedback: &CreateFeedback,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE stages SET status = 'rejected', updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 AND status = 'in_review'",
        )
        .bind(project_id)
        .bind(area)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        FeedbackRepo::append_inner(&mut tx, feedback).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// `rejected → in_review` on client resubmission. Progress resets to
    /// the review baseline and a new review round starts.
    pub async fn reopen(pool: &PgPool, project_id: DbId, area: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stages \
             SET status = 'in_review', started_at = NOW(), completed_at = NULL, \
                 progress = $3, updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 AND status = 'rejected'",
        )
        .bind(project_id)
        .bind(area)
        .bind(PROGRESS_REVIEW_BASELINE)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump progress by `increment`, capped below 100 while the stage is
    /// not approved. Status is unchanged.
    pub async fn bump_progress(
        pool: &PgPool,
        project_id: DbId,
        area: &str,
        increment: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stages \
             SET progress = LEAST(progress + $3, $4), updated_at = NOW() \
             WHERE project_id = $1 AND area = $2 AND status <> 'approved'",
        )
        .bind(project_id)
        .bind(area)
        .bind(increment)
        .bind(PROGRESS_UPLOAD_CAP)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stages sitting `in_review` with no activity for at least
    /// `stale_days` days. Feeds the reminder sweep.
    pub async fn list_stale_in_review(
        pool: &PgPool,
        stale_days: i64,
    ) -> Result<Vec<Stage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stages \
             WHERE status = 'in_review' \
               AND updated_at < NOW() - make_interval(days => $1::int) \
             ORDER BY updated_at ASC"
        );
        sqlx::query_as::<_, Stage>(&query)
            .bind(stale_days)
            .fetch_all(pool)
            .await
    }
}
