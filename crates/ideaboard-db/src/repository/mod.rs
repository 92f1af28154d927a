//! SurrealDB repository implementations.

mod health;
mod idea;
mod tenant;
mod user;

pub use health::SurrealHealthCheck;
pub use idea::SurrealIdeaRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Parse a UUID stored as a string, naming the entity on failure.
fn parse_uuid(value: &str, entity: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {entity} UUID: {e}")))
}
