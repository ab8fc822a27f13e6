//! Repository for the append-only `feedback` table.
//!
//! There is deliberately no update or delete method: the ledger is an
//! audit trail. Rows disappear only with their project (cascade).

use sqlx::PgPool;

use gradus_core::types::DbId;

use crate::models::feedback::{CreateFeedback, FeedbackEntry};

/// Column list for `feedback` queries.
const COLUMNS: &str = "id, project_id, area, author_id, kind, message, created_at";

/// Provides append/list access to the feedback ledger.
pub struct FeedbackRepo;

impl FeedbackRepo {
    /// Append an entry, returning the created row.
    pub async fn append(
        pool: &PgPool,
        input: &CreateFeedback,
    ) -> Result<FeedbackEntry, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let entry = Self::append_inner(&mut tx, input).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Append within a caller-owned transaction, so a decision and its
    /// ledger entry commit together.
    pub(crate) async fn append_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateFeedback,
    ) -> Result<FeedbackEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO feedback (project_id, area, author_id, kind, message) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FeedbackEntry>(&query)
            .bind(input.project_id)
            .bind(&input.area)
            .bind(input.author_id)
            .bind(&input.kind)
            .bind(&input.message)
            .fetch_one(&mut **tx)
            .await
    }

    /// All entries for a project in append order (creation time, then id
    /// to break same-millisecond ties).
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<FeedbackEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM feedback WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, FeedbackEntry>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Entries of one kind for a project, append order. Used to build the
    /// rejection feedback list.
    pub async fn list_by_project_and_kind(
        pool: &PgPool,
        project_id: DbId,
        kind: &str,
    ) -> Result<Vec<FeedbackEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM feedback \
             WHERE project_id = $1 AND kind = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, FeedbackEntry>(&query)
            .bind(project_id)
            .bind(kind)
            .fetch_all(pool)
            .await
    }
}
