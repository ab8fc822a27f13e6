use gradus_core::CoreError;

/// Error type for workflow engine operations.
///
/// Notification delivery failures are deliberately absent: they are
/// recorded on the notification record and retried asynchronously, never
/// surfaced through an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("File store error: {0}")]
    Storage(#[from] std::io::Error),
}
