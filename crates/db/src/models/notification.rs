//! Notification record model and DTO.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use gradus_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
///
/// One row per attempted outbound message. `status` moves
/// `pending → sent | failed`; `sent` never reverts and `retry_count`
/// never exceeds the configured maximum.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub recipient: String,
    pub recipient_kind: String,
    pub kind: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub retry_count: i32,
    /// Free-form metadata; reminder/deadline sweeps store their
    /// date-bucketed `dedup_key` here.
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub opened_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
}

/// DTO for creating a notification record (always starts `pending`).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub project_id: Option<DbId>,
    pub recipient: String,
    pub recipient_kind: String,
    pub kind: String,
    pub subject: String,
    pub body: String,
    pub metadata: serde_json::Value,
}
