//! Error types for Ideaboard.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoardError {
    /// Whether this error is the "not found" condition callers are
    /// expected to branch on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BoardError::NotFound { .. })
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
