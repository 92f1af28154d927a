//! Database-specific error types and conversions.

use ideaboard_core::error::BoardError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid stored value: {0}")]
    Decode(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

/// Messages SurrealDB reports when a write lost a race with a concurrent
/// transaction: an optimistic commit conflict, or a unique index entry
/// claimed in between our read and our write.
const RETRYABLE_MARKERS: &[&str] = &[
    "Transaction conflict",
    "retry the transaction",
    "already contains",
];

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether running the whole operation again may succeed.
    pub(crate) fn is_retryable(&self) -> bool {
        let message = match self {
            DbError::Surreal(e) => e.to_string(),
            DbError::Query(msg) => msg.clone(),
            _ => return false,
        };

        RETRYABLE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }
}

impl From<DbError> for BoardError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BoardError::NotFound { entity, id },
            other => BoardError::Database(other.to_string()),
        }
    }
}
