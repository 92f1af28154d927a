//! Comment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub idea_id: Uuid,
    pub content: String,
    pub author: User,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub tenant_id: Uuid,
    pub idea_id: Uuid,
    /// Author of the comment.
    pub user_id: Uuid,
    pub content: String,
}
