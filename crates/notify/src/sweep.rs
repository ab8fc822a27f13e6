//! Background sweeps: delivery retry, stale-review reminders, deadline
//! warnings, and record retention.
//!
//! A single active worker is sufficient; running the sweeps from several
//! instances stays safe because every retry is claimed per record and the
//! reminder/deadline raises are deduplicated per (project, kind, day).

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use gradus_core::notification::{
    NotificationKind, DEADLINE_WARNING_DAYS, REMINDER_STALE_DAYS,
};
use gradus_db::repositories::{ProjectRepo, StageRepo};
use gradus_db::DbPool;

use crate::directory::RecipientDirectory;
use crate::dispatcher::Dispatcher;

/// How often failed deliveries are re-attempted.
const RETRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How often reminders and deadline warnings are scanned. The raises are
/// date-deduplicated, so a shorter interval only costs reads.
const SCAN_INTERVAL: Duration = Duration::from_secs(3600);

/// Retention window for terminal notification records.
const RETENTION_DAYS: i64 = 90;

// ---------------------------------------------------------------------------
// SweepService
// ---------------------------------------------------------------------------

/// Periodic background processor for the notification subsystem.
pub struct SweepService {
    pool: DbPool,
    dispatcher: Arc<Dispatcher>,
    directory: Arc<dyn RecipientDirectory>,
}

impl SweepService {
    pub fn new(
        pool: DbPool,
        dispatcher: Arc<Dispatcher>,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            directory,
        }
    }

    /// Run both sweep loops until the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut retry_tick = tokio::time::interval(RETRY_SWEEP_INTERVAL);
        let mut scan_tick = tokio::time::interval(SCAN_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification sweeps cancelled");
                    break;
                }
                _ = retry_tick.tick() => {
                    match self.dispatcher.retry_failed().await {
                        Ok(outcome) if outcome.claimed > 0 => {
                            tracing::info!(
                                claimed = outcome.claimed,
                                delivered = outcome.delivered,
                                "Retry sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Retry sweep failed"),
                    }
                }
                _ = scan_tick.tick() => {
                    if let Err(e) = self.scan_reminders().await {
                        tracing::error!(error = %e, "Reminder scan failed");
                    }
                    if let Err(e) = self.scan_deadlines().await {
                        tracing::error!(error = %e, "Deadline scan failed");
                    }
                    if let Err(e) = self.dispatcher.purge_older_than(RETENTION_DAYS).await {
                        tracing::error!(error = %e, "Notification purge failed");
                    }
                }
            }
        }
    }

    /// Remind on `in_review` stages with no activity for three days or
    /// more. Read-only over stage data; raises at most one reminder per
    /// (project, day).
    pub async fn scan_reminders(&self) -> Result<(), sqlx::Error> {
        let stale = StageRepo::list_stale_in_review(&self.pool, REMINDER_STALE_DAYS).await?;

        for stage in stale {
            let recipients = match stage.reviewer_id {
                Some(reviewer_id) => match self.directory.lookup(reviewer_id).await {
                    Some(r) => vec![r],
                    None => self.directory.admins().await,
                },
                // Nobody assigned: the administrators get the reminder.
                None => self.directory.admins().await,
            };
            if recipients.is_empty() {
                continue;
            }

            let project = match ProjectRepo::find_by_id(&self.pool, stage.project_id).await? {
                Some(p) => p,
                None => continue,
            };

            let days_stalled = (chrono::Utc::now() - stage.updated_at).num_days();
            let raised = self
                .dispatcher
                .raise_deduped(
                    NotificationKind::ReminderPendingReview,
                    project.id,
                    &recipients,
                    &json!({
                        "project_code": project.code,
                        "project_title": project.title,
                        "area": stage.area,
                        "days_stalled": days_stalled.to_string(),
                    }),
                )
                .await?;
            if raised {
                tracing::info!(
                    project_id = project.id,
                    area = %stage.area,
                    days_stalled,
                    "Stale review reminder raised"
                );
            }
        }

        Ok(())
    }

    /// Warn on projects within three days of their estimated completion
    /// date whose review is still open. Deduplicated per (project, day).
    pub async fn scan_deadlines(&self) -> Result<(), sqlx::Error> {
        let nearing = ProjectRepo::list_nearing_deadline(&self.pool, DEADLINE_WARNING_DAYS).await?;

        for project in nearing {
            let recipients = match self.directory.lookup(project.owner_id).await {
                Some(r) => vec![r],
                None => continue,
            };

            let estimated = project
                .estimated_completion
                .map(|d| d.to_string())
                .unwrap_or_default();
            let raised = self
                .dispatcher
                .raise_deduped(
                    NotificationKind::ProjectDeadlineWarning,
                    project.id,
                    &recipients,
                    &json!({
                        "project_code": project.code,
                        "project_title": project.title,
                        "estimated_completion": estimated,
                    }),
                )
                .await?;
            if raised {
                tracing::info!(project_id = project.id, "Deadline warning raised");
            }
        }

        Ok(())
    }
}
