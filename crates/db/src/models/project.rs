//! Project entity model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use gradus_core::types::{DbId, Timestamp};

/// A project row from the `projects` table.
///
/// `status` is derived from the stage set; it is written only through the
/// engine's recompute step or the logged administrative override.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    /// Human-readable code, immutable once assigned.
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: DbId,
    pub status: String,
    pub priority: String,
    /// Set when the client formally submits; `None` while drafting.
    pub submitted_at: Option<Timestamp>,
    pub estimated_completion: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project (always starts in `draft`).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub owner_id: DbId,
    /// Defaults to `medium` if omitted.
    pub priority: Option<String>,
    pub estimated_completion: Option<NaiveDate>,
}
