//! Notification kinds, delivery status, and retry/reminder policy.
//!
//! The kind enumeration is the wire contract between the dispatcher and
//! the templates; the string forms are stored in `notifications.kind`.

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

/// Maximum delivery attempts after the initial one. Records that exhaust
/// this budget stay `failed` and are surfaced for manual inspection.
pub const MAX_RETRY_ATTEMPTS: i32 = 3;

/// Minimum age of a failed record before the retry sweep touches it.
pub const RETRY_MIN_AGE_SECS: i64 = 5 * 60;

/// An `in_review` stage with no activity for this many days triggers a
/// `reminder_pending_review` notification.
pub const REMINDER_STALE_DAYS: i64 = 3;

/// Projects within this many days of their estimated completion date get a
/// `project_deadline_warning`.
pub const DEADLINE_WARNING_DAYS: i64 = 3;

/// Bound on a single mail transport round trip.
pub const TRANSPORT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// Enumerated notification types (wire contract with templates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ProjectSubmitted,
    ProjectApproved,
    ProjectRejected,
    DocumentUploaded,
    FeedbackAdded,
    ProjectAssigned,
    ReminderPendingReview,
    ProjectDeadlineWarning,
    WeeklySummary,
    BulkActionCompleted,
}

/// All notification kinds.
pub const ALL_KINDS: &[NotificationKind] = &[
    NotificationKind::ProjectSubmitted,
    NotificationKind::ProjectApproved,
    NotificationKind::ProjectRejected,
    NotificationKind::DocumentUploaded,
    NotificationKind::FeedbackAdded,
    NotificationKind::ProjectAssigned,
    NotificationKind::ReminderPendingReview,
    NotificationKind::ProjectDeadlineWarning,
    NotificationKind::WeeklySummary,
    NotificationKind::BulkActionCompleted,
];

impl NotificationKind {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ProjectSubmitted => "project_submitted",
            NotificationKind::ProjectApproved => "project_approved",
            NotificationKind::ProjectRejected => "project_rejected",
            NotificationKind::DocumentUploaded => "document_uploaded",
            NotificationKind::FeedbackAdded => "feedback_added",
            NotificationKind::ProjectAssigned => "project_assigned",
            NotificationKind::ReminderPendingReview => "reminder_pending_review",
            NotificationKind::ProjectDeadlineWarning => "project_deadline_warning",
            NotificationKind::WeeklySummary => "weekly_summary",
            NotificationKind::BulkActionCompleted => "bulk_action_completed",
        }
    }

    /// Parse from a stored string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        ALL_KINDS
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification kind: '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// DeliveryStatus
// ---------------------------------------------------------------------------

/// Delivery status of a notification record. `Sent` is terminal: once set
/// it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown delivery status: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RecipientKind
// ---------------------------------------------------------------------------

/// Who a notification addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    User,
    Reviewer,
    Admin,
}

impl RecipientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::User => "user",
            RecipientKind::Reviewer => "reviewer",
            RecipientKind::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "user" => Ok(RecipientKind::User),
            "reviewer" => Ok(RecipientKind::Reviewer),
            "admin" => Ok(RecipientKind::Admin),
            other => Err(CoreError::Validation(format!(
                "Unknown recipient kind: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reminder deduplication
// ---------------------------------------------------------------------------

/// Date-bucketed dedup key for reminder/deadline sweeps.
///
/// The sweeps are idempotent per (project, kind, UTC day): before raising,
/// the dispatcher checks whether a record with this key already exists.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use gradus_core::notification::{dedup_key, NotificationKind};
///
/// let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
/// let key = dedup_key(NotificationKind::ReminderPendingReview, 42, day);
/// assert_eq!(key, "reminder_pending_review:42:2026-08-30");
/// ```
pub fn dedup_key(kind: NotificationKind, project_id: DbId, day: NaiveDate) -> String {
    format!("{}:{project_id}:{day}", kind.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip_covers_all_ten() {
        assert_eq!(ALL_KINDS.len(), 10);
        for kind in ALL_KINDS {
            assert_eq!(NotificationKind::from_str(kind.as_str()).unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(NotificationKind::from_str("project_exploded").is_err());
    }

    #[test]
    fn delivery_status_round_trip() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Sent,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(DeliveryStatus::from_str("bounced").is_err());
    }

    #[test]
    fn recipient_kind_round_trip() {
        for kind in [
            RecipientKind::User,
            RecipientKind::Reviewer,
            RecipientKind::Admin,
        ] {
            assert_eq!(RecipientKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn dedup_key_is_date_bucketed() {
        let d1 = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let k1 = dedup_key(NotificationKind::ReminderPendingReview, 7, d1);
        let k2 = dedup_key(NotificationKind::ReminderPendingReview, 7, d2);
        assert_ne!(k1, k2);
        // Same day, same project, same kind -> same key.
        assert_eq!(k1, dedup_key(NotificationKind::ReminderPendingReview, 7, d1));
    }

    #[test]
    fn dedup_key_distinguishes_projects_and_kinds() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_ne!(
            dedup_key(NotificationKind::ReminderPendingReview, 1, day),
            dedup_key(NotificationKind::ReminderPendingReview, 2, day)
        );
        assert_ne!(
            dedup_key(NotificationKind::ReminderPendingReview, 1, day),
            dedup_key(NotificationKind::ProjectDeadlineWarning, 1, day)
        );
    }

    #[test]
    fn retry_policy_constants() {
        assert_eq!(MAX_RETRY_ATTEMPTS, 3);
        assert_eq!(RETRY_MIN_AGE_SECS, 300);
    }
}
