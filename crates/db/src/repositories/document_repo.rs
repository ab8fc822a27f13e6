//! Repository for the `documents` table.

use sqlx::PgPool;

use gradus_core::types::DbId;

use crate::models::document::{CreateDocument, Document};

/// Column list for `documents` queries.
const COLUMNS: &str = "id, project_id, area, stage_id, storage_path, original_name, \
     checksum, approved, created_at";

/// Provides persistence for uploaded documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Record an uploaded document. Not yet attached to any stage.
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (project_id, area, storage_path, original_name, checksum) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(&input.area)
            .bind(&input.storage_path)
            .bind(&input.original_name)
            .bind(&input.checksum)
            .fetch_one(pool)
            .await
    }

    /// Find a document by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Attach a verified document to its stage. Only unattached documents
    /// can be attached; returns `false` otherwise.
    pub async fn attach_to_stage(
        pool: &PgPool,
        document_id: DbId,
        stage_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET stage_id = $2 WHERE id = $1 AND stage_id IS NULL",
        )
        .bind(document_id)
        .bind(stage_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a project's documents, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE project_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
