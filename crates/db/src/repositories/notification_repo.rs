//! Repository for the `notifications` table.
//!
//! Delivery bookkeeping has two invariants the SQL must uphold:
//! `sent` is terminal (no update path reverts it), and a failed record is
//! re-attempted only after an optimistic claim bumps its `retry_count`,
//! so two concurrent sweep runs never send the same record twice.

use sqlx::PgPool;

use gradus_core::types::DbId;

use crate::models::notification::{CreateNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, project_id, recipient, recipient_kind, kind, subject, body, \
     status, retry_count, metadata, created_at, sent_at, opened_at, clicked_at";

/// Provides persistence for notification delivery records.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Create a `pending` record for one recipient.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
             (project_id, recipient, recipient_kind, kind, subject, body, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.project_id)
            .bind(&input.recipient)
            .bind(&input.recipient_kind)
            .bind(&input.kind)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Find a record by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a record `sent`. Guarded so an already-`sent` record is never
    /// touched again (terminal status).
    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'sent', sent_at = NOW() \
             WHERE id = $1 AND status <> 'sent'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the initial delivery attempt failed. Only a `pending` record
    /// can move here; retries keep the record `failed` and bump
    /// `retry_count` via [`Self::claim_for_retry`].
    pub async fn mark_failed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'failed' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Failed records eligible for retry: under the attempt budget and
    /// older than `min_age_secs`.
    pub async fn list_retryable(
        pool: &PgPool,
        max_attempts: i32,
        min_age_secs: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = 'failed' AND retry_count < $1 \
               AND created_at < NOW() - make_interval(secs => $2::double precision) \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(max_attempts)
            .bind(min_age_secs)
            .fetch_all(pool)
            .await
    }

    /// Optimistically claim a failed record for one retry attempt.
    ///
    /// Check-and-set on `(status, retry_count)`: the bump succeeds for
    /// exactly one claimant; a concurrent sweep that read the same
    /// snapshot sees zero affected rows and skips the record.
    pub async fn claim_for_retry(
        pool: &PgPool,
        id: DbId,
        expected_retry_count: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET retry_count = retry_count + 1 \
             WHERE id = $1 AND status = 'failed' AND retry_count = $2",
        )
        .bind(id)
        .bind(expected_retry_count)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Records that exhausted their retry budget. These stay `failed`
    /// permanently and are surfaced for manual inspection.
    pub async fn list_exhausted(
        pool: &PgPool,
        max_attempts: i32,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = 'failed' AND retry_count >= $1 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(max_attempts)
            .fetch_all(pool)
            .await
    }

    /// Whether a record with the given date-bucketed dedup key exists.
    /// Keys are written into `metadata` by the reminder/deadline sweeps.
    pub async fn dedup_exists(pool: &PgPool, dedup_key: &str) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE metadata->>'dedup_key' = $1)",
        )
        .bind(dedup_key)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Record that the recipient opened the message.
    pub async fn mark_opened(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET opened_at = NOW() WHERE id = $1 AND opened_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record that the recipient clicked through.
    pub async fn mark_clicked(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET clicked_at = NOW() WHERE id = $1 AND clicked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Purge terminal records older than the retention window: everything
    /// `sent`, plus `failed` records that exhausted their retries.
    /// Returns the number of rows removed.
    pub async fn purge_older_than(
        pool: &PgPool,
        retention_days: i64,
        max_attempts: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE created_at < NOW() - make_interval(days => $1::int) \
               AND (status = 'sent' OR (status = 'failed' AND retry_count >= $2))",
        )
        .bind(retention_days)
        .bind(max_attempts)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
