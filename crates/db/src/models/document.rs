//! Document entity model and DTO.
//!
//! Storage itself lives behind the engine's `FileStore`; this table only
//! records the path, the checksum captured at upload time, and the stage
//! association once integrity verification has passed.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use gradus_core::types::{DbId, Timestamp};

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: DbId,
    pub area: String,
    /// Set only after the stored checksum verified against the file.
    pub stage_id: Option<DbId>,
    pub storage_path: String,
    pub original_name: String,
    pub checksum: String,
    pub approved: bool,
    pub created_at: Timestamp,
}

/// DTO for recording an uploaded document (not yet attached to a stage).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub project_id: DbId,
    pub area: String,
    pub storage_path: String,
    pub original_name: String,
    pub checksum: String,
}
