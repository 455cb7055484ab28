use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The submitted payload is missing a well-formed `responses` array.
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
