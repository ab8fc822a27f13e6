//! Feedback ledger entry model and DTO.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use gradus_core::types::{DbId, Timestamp};

/// A row from the append-only `feedback` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeedbackEntry {
    pub id: DbId,
    pub project_id: DbId,
    /// Optional area the feedback is tied to.
    pub area: Option<String>,
    pub author_id: DbId,
    pub kind: String,
    pub message: String,
    pub created_at: Timestamp,
}

/// DTO for appending a feedback entry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFeedback {
    pub project_id: DbId,
    pub area: Option<String>,
    pub author_id: DbId,
    pub kind: String,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}
