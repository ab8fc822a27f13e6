//! Stage entity model.
//!
//! One row per (project, area) pair; the pair is unique. Stages are
//! created in bulk when a project is submitted and never deleted
//! independently of the project.

use serde::Serialize;
use sqlx::FromRow;

use gradus_core::types::{DbId, Timestamp};

/// A stage row from the `stages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Stage {
    pub id: DbId,
    pub project_id: DbId,
    pub area: String,
    pub status: String,
    pub reviewer_id: Option<DbId>,
    /// 0–100, derived from status and upload activity.
    pub progress: i16,
    pub started_at: Option<Timestamp>,
    pub due_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
