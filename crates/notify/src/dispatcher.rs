//! Notification dispatcher: durable records, immediate delivery, bounded
//! retry.
//!
//! Every domain event becomes one notification record per recipient. The
//! record is the source of truth for delivery state; the transport call is
//! best-effort and its failure never escalates to the caller of the
//! originating workflow action.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use gradus_core::notification::{
    NotificationKind, RecipientKind, MAX_RETRY_ATTEMPTS, RETRY_MIN_AGE_SECS,
    TRANSPORT_TIMEOUT_SECS,
};
use gradus_core::types::DbId;
use gradus_db::models::notification::{CreateNotification, Notification};
use gradus_db::repositories::NotificationRepo;
use gradus_db::DbPool;

use crate::template;
use crate::transport::{MailTransport, OutboundEmail, TransportError};

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// One addressee of a raised event.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub address: String,
    pub kind: RecipientKind,
}

impl Recipient {
    pub fn user(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: RecipientKind::User,
        }
    }

    pub fn reviewer(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: RecipientKind::Reviewer,
        }
    }

    pub fn admin(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: RecipientKind::Admin,
        }
    }
}

// ---------------------------------------------------------------------------
// Sweep outcome
// ---------------------------------------------------------------------------

/// Counters returned by [`Dispatcher::retry_failed`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Records claimed by this sweep run.
    pub claimed: usize,
    /// Claimed records that delivered successfully.
    pub delivered: usize,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Turns domain events into outbound messages with delivery bookkeeping.
pub struct Dispatcher {
    pool: DbPool,
    transport: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(pool: DbPool, transport: Arc<dyn MailTransport>) -> Self {
        Self { pool, transport }
    }

    /// Raise a domain event: create one record per recipient, attempt
    /// immediate delivery, record the outcome.
    ///
    /// The returned error covers persistence only — a transport failure
    /// lands in the record as `failed` and is retried by the sweep.
    pub async fn raise(
        &self,
        kind: NotificationKind,
        project_id: Option<DbId>,
        recipients: &[Recipient],
        vars: &serde_json::Value,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let (subject, body) = template::render(kind, vars);
        let mut records = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let record = NotificationRepo::create(
                &self.pool,
                &CreateNotification {
                    project_id,
                    recipient: recipient.address.clone(),
                    recipient_kind: recipient.kind.as_str().to_string(),
                    kind: kind.as_str().to_string(),
                    subject: subject.clone(),
                    body: body.clone(),
                    metadata: vars.clone(),
                },
            )
            .await?;

            let email = OutboundEmail::new(&record.recipient, &record.subject, &record.body);
            match self.attempt(&email).await {
                Ok(()) => {
                    NotificationRepo::mark_sent(&self.pool, record.id).await?;
                    tracing::info!(
                        notification_id = record.id,
                        kind = kind.as_str(),
                        recipient = %record.recipient,
                        "Notification delivered"
                    );
                }
                Err(e) => {
                    NotificationRepo::mark_failed(&self.pool, record.id).await?;
                    tracing::warn!(
                        notification_id = record.id,
                        kind = kind.as_str(),
                        recipient = %record.recipient,
                        error = %e,
                        "Notification delivery failed, queued for retry"
                    );
                }
            }

            // Re-read so callers observe the final status.
            if let Some(current) = NotificationRepo::find_by_id(&self.pool, record.id).await? {
                records.push(current);
            }
        }

        Ok(records)
    }

    /// Raise at most once per (kind, project, UTC day).
    ///
    /// Returns `false` when a record with today's dedup key already
    /// exists. The key is stored in the record metadata so the existence
    /// check and the write share one source of truth.
    pub async fn raise_deduped(
        &self,
        kind: NotificationKind,
        project_id: DbId,
        recipients: &[Recipient],
        vars: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let key = gradus_core::notification::dedup_key(kind, project_id, Utc::now().date_naive());
        if NotificationRepo::dedup_exists(&self.pool, &key).await? {
            return Ok(false);
        }

        let mut vars = vars.clone();
        if let Some(map) = vars.as_object_mut() {
            map.insert("dedup_key".to_string(), serde_json::Value::String(key));
        }
        self.raise(kind, Some(project_id), recipients, &vars).await?;
        Ok(true)
    }

    /// Retry failed deliveries within the attempt budget.
    ///
    /// Each eligible record is claimed with an optimistic check-and-set on
    /// `(status, retry_count)` before the transport call; a concurrent
    /// sweep that read the same snapshot loses the claim and skips. On
    /// success the record becomes `sent`; on failure the already-bumped
    /// retry count stands. Exhausted records are left alone.
    pub async fn retry_failed(&self) -> Result<RetryOutcome, sqlx::Error> {
        let eligible =
            NotificationRepo::list_retryable(&self.pool, MAX_RETRY_ATTEMPTS, RETRY_MIN_AGE_SECS)
                .await?;

        let mut outcome = RetryOutcome::default();
        for record in eligible {
            let claimed =
                NotificationRepo::claim_for_retry(&self.pool, record.id, record.retry_count)
                    .await?;
            if !claimed {
                continue;
            }
            outcome.claimed += 1;

            let email = OutboundEmail::new(&record.recipient, &record.subject, &record.body);
            match self.attempt(&email).await {
                Ok(()) => {
                    NotificationRepo::mark_sent(&self.pool, record.id).await?;
                    outcome.delivered += 1;
                    tracing::info!(
                        notification_id = record.id,
                        attempt = record.retry_count + 1,
                        "Notification retry delivered"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        notification_id = record.id,
                        attempt = record.retry_count + 1,
                        error = %e,
                        "Notification retry failed"
                    );
                }
            }
        }

        Ok(outcome)
    }

    /// Failed records that exhausted their retry budget, oldest first.
    pub async fn list_exhausted(&self) -> Result<Vec<Notification>, sqlx::Error> {
        NotificationRepo::list_exhausted(&self.pool, MAX_RETRY_ATTEMPTS).await
    }

    /// Drop terminal records older than `retention_days`.
    pub async fn purge_older_than(&self, retention_days: i64) -> Result<u64, sqlx::Error> {
        let purged =
            NotificationRepo::purge_older_than(&self.pool, retention_days, MAX_RETRY_ATTEMPTS)
                .await?;
        if purged > 0 {
            tracing::info!(purged, retention_days, "Purged old notification records");
        }
        Ok(purged)
    }

    /// One bounded delivery attempt. A timeout counts as failure on the
    /// normal retry path.
    async fn attempt(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        match tokio::time::timeout(
            Duration::from_secs(TRANSPORT_TIMEOUT_SECS),
            self.transport.send(email),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
