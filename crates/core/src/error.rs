use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Attempted stage/project transition not legal from the current state.
    #[error("Invalid state: cannot {action} while '{status}'")]
    InvalidState {
        action: &'static str,
        status: &'static str,
    },

    /// A direct status write conflicts with the value derived from stages.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// Document checksum mismatch.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
