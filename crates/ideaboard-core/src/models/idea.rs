//! Idea domain model.
//!
//! An idea is a user-submitted suggestion. Each idea carries a
//! tenant-scoped sequential `number` and a `slug` derived from its title,
//! which together form its public address (e.g., `/ideas/42/dark-mode`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdeaStatus {
    New,
    Started,
    Completed,
    Declined,
}

impl IdeaStatus {
    pub const ALL: [IdeaStatus; 4] = [
        IdeaStatus::New,
        IdeaStatus::Started,
        IdeaStatus::Completed,
        IdeaStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::New => "New",
            IdeaStatus::Started => "Started",
            IdeaStatus::Completed => "Completed",
            IdeaStatus::Declined => "Declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "New" => Some(IdeaStatus::New),
            "Started" => Some(IdeaStatus::Started),
            "Completed" => Some(IdeaStatus::Completed),
            "Declined" => Some(IdeaStatus::Declined),
            _ => None,
        }
    }

    /// Closed ideas no longer accept supporters, and their supporter
    /// count is frozen.
    pub fn is_closed(&self) -> bool {
        matches!(self, IdeaStatus::Completed | IdeaStatus::Declined)
    }
}

/// An administrative reply attached to an idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaResponse {
    pub text: String,
    /// The user who responded.
    pub user: User,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Sequential within the tenant, starting at 1.
    pub number: u32,
    pub title: String,
    /// Unique within the tenant.
    pub slug: String,
    pub description: String,
    pub status: IdeaStatus,
    pub total_supporters: u32,
    /// The user who submitted the idea.
    pub author: User,
    pub response: Option<IdeaResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdea {
    pub tenant_id: Uuid,
    /// Author of the idea.
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateIdea {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields for responding to an idea and moving it to a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    /// The responding user, usually an administrator.
    pub user_id: Uuid,
    pub text: String,
    pub status: IdeaStatus,
}
