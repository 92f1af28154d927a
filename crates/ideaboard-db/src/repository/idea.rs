//! SurrealDB implementation of [`IdeaRepository`].
//!
//! Ideas reference their author and responder by user id; reads load
//! those users from the same tenant in one extra query and attach them.
//! Supporters are `user -> supports -> idea` edges, and the denormalized
//! `supporters` counter is recomputed from the edges in the same
//! transaction that adds or removes one. That transaction also re-reads
//! the idea status, so a supporter change racing with a close either
//! lands before it or becomes a no-op.
//!
//! Writes that can collide with a concurrent writer go through
//! [`with_retry`]; every attempt re-reads its inputs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ideaboard_core::error::BoardResult;
use ideaboard_core::models::comment::{Comment, CreateComment};
use ideaboard_core::models::idea::{
    CreateIdea, Idea, IdeaResponse, IdeaStatus, SetResponse, UpdateIdea,
};
use ideaboard_core::models::user::User;
use ideaboard_core::repository::IdeaRepository;
use ideaboard_core::slug::{slugify, unique_slug};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::user::{ensure_user_in_tenant, users_by_ids};
use super::{CountRow, parse_uuid};
use crate::error::DbError;
use crate::retry::with_retry;

/// Binds `$open` to whether `$idea_id` exists in `$tenant_id` with a
/// status outside `$closed`.
const LOAD_OPEN: &str = "\
LET $status = (SELECT VALUE status FROM type::record('idea', $idea_id) \
WHERE tenant_id = $tenant_id)[0]; \
LET $open = $status != NONE AND $status NOTINSIDE $closed;";

/// Recomputes the counter of `$idea_id` from its supporter edges.
const RECOUNT_SUPPORTERS: &str = "\
UPDATE type::record('idea', $idea_id) SET \
supporters = array::len((SELECT VALUE id FROM supports \
WHERE out = type::record('idea', $idea_id)));";

/// DB-side idea row including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct IdeaRow {
    record_id: String,
    tenant_id: String,
    number: u32,
    title: String,
    slug: String,
    description: String,
    user_id: String,
    status: String,
    supporters: u32,
    response_text: Option<String>,
    response_user_id: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<IdeaStatus, DbError> {
    IdeaStatus::parse(s).ok_or_else(|| DbError::Decode(format!("unknown idea status: {s}")))
}

fn closed_statuses() -> Vec<String> {
    IdeaStatus::ALL
        .iter()
        .filter(|s| s.is_closed())
        .map(|s| s.as_str().to_string())
        .collect()
}

fn lookup_user(users: &HashMap<String, User>, id: &str) -> Result<User, DbError> {
    users
        .get(id)
        .cloned()
        .ok_or_else(|| DbError::not_found("user", id))
}

impl IdeaRow {
    fn user_ids(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.user_id).chain(self.response_user_id.iter())
    }

    fn try_into_idea(self, users: &HashMap<String, User>) -> Result<Idea, DbError> {
        let response = match (self.response_text, self.response_user_id, self.responded_at) {
            (Some(text), Some(user_id), Some(responded_at)) => Some(IdeaResponse {
                text,
                user: lookup_user(users, &user_id)?,
                responded_at,
            }),
            _ => None,
        };

        Ok(Idea {
            id: parse_uuid(&self.record_id, "idea")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            number: self.number,
            title: self.title,
            slug: self.slug,
            description: self.description,
            status: parse_status(&self.status)?,
            total_supporters: self.supporters,
            author: lookup_user(users, &self.user_id)?,
            response,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side comment row including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CommentRow {
    record_id: String,
    tenant_id: String,
    idea_id: String,
    user_id: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl CommentRow {
    fn try_into_comment(self, users: &HashMap<String, User>) -> Result<Comment, DbError> {
        Ok(Comment {
            id: parse_uuid(&self.record_id, "comment")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            idea_id: parse_uuid(&self.idea_id, "idea")?,
            content: self.content,
            author: lookup_user(users, &self.user_id)?,
            created_at: self.created_at,
        })
    }
}

/// DB-side row for the highest idea number of a tenant.
#[derive(Debug, SurrealValue)]
struct NumberRow {
    number: u32,
}

/// DB-side row for a freshly created comment.
#[derive(Debug, SurrealValue)]
struct CreatedCommentRow {
    created_at: DateTime<Utc>,
}

/// SurrealDB implementation of the Idea repository.
#[derive(Clone)]
pub struct SurrealIdeaRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealIdeaRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_row(&self, tenant_id: Uuid, id: Uuid) -> Result<IdeaRow, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('idea', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<IdeaRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("idea", id_str))
    }

    /// Attach authors and responders to a batch of rows.
    async fn hydrate(&self, tenant_id: Uuid, rows: Vec<IdeaRow>) -> Result<Vec<Idea>, DbError> {
        let mut ids: Vec<String> = rows.iter().flat_map(|r| r.user_ids().cloned()).collect();
        ids.sort_unstable();
        ids.dedup();

        let users = users_by_ids(&self.db, tenant_id, ids).await?;

        rows.into_iter()
            .map(|row| row.try_into_idea(&users))
            .collect()
    }

    async fn hydrate_one(&self, tenant_id: Uuid, row: IdeaRow) -> Result<Idea, DbError> {
        let id = row.record_id.clone();
        self.hydrate(tenant_id, vec![row])
            .await?
            .pop()
            .ok_or_else(|| DbError::not_found("idea", id))
    }

    async fn next_number(&self, tenant_id: Uuid) -> Result<u32, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT number FROM idea WHERE tenant_id = $tenant_id \
                 ORDER BY number DESC LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<NumberRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.number).unwrap_or(0) + 1)
    }

    /// Slugs in the tenant that start with `base`, ignoring idea `exclude`.
    async fn taken_slugs(
        &self,
        tenant_id: Uuid,
        base: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE slug FROM idea \
                 WHERE tenant_id = $tenant_id \
                 AND string::starts_with(slug, $base) \
                 AND meta::id(id) != $exclude",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("base", base.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string())))
            .await?;

        Ok(result.take(0)?)
    }

    /// Load the idea and report whether it still accepts supporter changes.
    ///
    /// Only a fast path: the supporter transactions check again.
    async fn accepts_supporters(&self, tenant_id: Uuid, idea_id: Uuid) -> Result<bool, DbError> {
        let row = self.find_row(tenant_id, idea_id).await?;
        let status = parse_status(&row.status)?;

        if status.is_closed() {
            debug!(
                tenant_id = %tenant_id,
                idea_id = %idea_id,
                status = status.as_str(),
                "Idea is closed, supporters are frozen"
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Create idea `id` with the next free number and slug of its tenant.
    ///
    /// The unique `(tenant_id, number)` and `(tenant_id, slug)` indexes
    /// reject an attempt whose reads were overtaken by a concurrent save.
    async fn insert(&self, id: Uuid, input: &CreateIdea) -> Result<(u32, String), DbError> {
        let number = self.next_number(input.tenant_id).await?;
        let base = slugify(&input.title);
        let taken = self.taken_slugs(input.tenant_id, &base, None).await?;
        let slug = unique_slug(&base, number, taken.as_slice());

        self.db
            .query(
                "CREATE type::record('idea', $id) SET \
                 tenant_id = $tenant_id, number = $number, \
                 title = $title, slug = $slug, \
                 description = $description, user_id = $user_id, \
                 status = $status, supporters = 0",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("number", number))
            .bind(("title", input.title.clone()))
            .bind(("slug", slug.clone()))
            .bind(("description", input.description.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("status", IdeaStatus::New.as_str().to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok((number, slug))
    }

    async fn apply_update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: &UpdateIdea,
    ) -> Result<(), DbError> {
        let row = self.find_row(tenant_id, id).await?;

        let slug = match input.title.as_deref() {
            Some(title) => {
                let base = slugify(title);
                let taken = self.taken_slugs(tenant_id, &base, Some(id)).await?;
                Some(unique_slug(&base, row.number, taken.as_slice()))
            }
            None => None,
        };

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
            sets.push("slug = $slug");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('idea', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let (Some(title), Some(slug)) = (input.title.clone(), slug) {
            builder = builder.bind(("title", title)).bind(("slug", slug));
        }
        if let Some(description) = input.description.clone() {
            builder = builder.bind(("description", description));
        }

        builder
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn relate_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> Result<(), DbError> {
        let user_id_str = user_id.to_string();
        let idea_id_str = idea_id.to_string();

        // RELATE requires literal record-id syntax; UUIDs are safe to embed.
        let query = format!(
            "BEGIN TRANSACTION; \
             {LOAD_OPEN} \
             IF $open AND array::len((SELECT VALUE id FROM supports \
             WHERE in = type::record('user', $user_id) \
             AND out = type::record('idea', $idea_id))) = 0 {{ \
             RELATE user:`{user_id_str}` -> supports -> idea:`{idea_id_str}` \
             SET tenant_id = $tenant_id; \
             {RECOUNT_SUPPORTERS} \
             }}; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id_str))
            .bind(("idea_id", idea_id_str))
            .bind(("closed", closed_statuses()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn unrelate_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> Result<(), DbError> {
        let query = format!(
            "BEGIN TRANSACTION; \
             {LOAD_OPEN} \
             IF $open {{ \
             DELETE supports WHERE \
             in = type::record('user', $user_id) AND \
             out = type::record('idea', $idea_id); \
             {RECOUNT_SUPPORTERS} \
             }}; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("idea_id", idea_id.to_string()))
            .bind(("closed", closed_statuses()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn write_response(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
        input: &SetResponse,
    ) -> Result<(), DbError> {
        self.db
            .query(
                "UPDATE type::record('idea', $id) SET \
                 response_text = $text, \
                 response_user_id = $user_id, \
                 responded_at = time::now(), \
                 status = $status, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", idea_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("text", input.text.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("status", input.status.as_str().to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}

impl<C: Connection> IdeaRepository for SurrealIdeaRepository<C> {
    async fn save(&self, input: CreateIdea) -> BoardResult<Idea> {
        ensure_user_in_tenant(&self.db, input.tenant_id, input.user_id).await?;

        let id = Uuid::new_v4();
        let (number, slug) = with_retry("save_idea", || self.insert(id, &input)).await?;

        info!(
            tenant_id = %input.tenant_id,
            idea_id = %id,
            number,
            slug = %slug,
            "Idea created"
        );

        self.get_by_id(input.tenant_id, id).await
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> BoardResult<Idea> {
        let row = self.find_row(tenant_id, id).await?;
        Ok(self.hydrate_one(tenant_id, row).await?)
    }

    async fn get_by_number(&self, tenant_id: Uuid, number: u32) -> BoardResult<Idea> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM idea \
                 WHERE tenant_id = $tenant_id AND number = $number",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("number", number))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdeaRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("idea", format!("number={number}")))?;

        Ok(self.hydrate_one(tenant_id, row).await?)
    }

    async fn get_all(&self, tenant_id: Uuid) -> BoardResult<Vec<Idea>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM idea \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY number ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdeaRow> = result.take(0).map_err(DbError::from)?;

        Ok(self.hydrate(tenant_id, rows).await?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateIdea) -> BoardResult<Idea> {
        with_retry("update_idea", || self.apply_update(tenant_id, id, &input)).await?;
        self.get_by_id(tenant_id, id).await
    }

    async fn add_comment(&self, input: CreateComment) -> BoardResult<Comment> {
        self.find_row(input.tenant_id, input.idea_id).await?;

        let user_key = input.user_id.to_string();
        let mut users = users_by_ids(&self.db, input.tenant_id, vec![user_key.clone()]).await?;
        let author = users
            .remove(&user_key)
            .ok_or_else(|| DbError::not_found("user", user_key.clone()))?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('comment', $id) SET \
                 tenant_id = $tenant_id, idea_id = $idea_id, \
                 user_id = $user_id, content = $content",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("idea_id", input.idea_id.to_string()))
            .bind(("user_id", user_key))
            .bind(("content", input.content.clone()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CreatedCommentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("comment", id_str))?;

        Ok(Comment {
            id,
            tenant_id: input.tenant_id,
            idea_id: input.idea_id,
            content: input.content,
            author,
            created_at: row.created_at,
        })
    }

    async fn get_comments_by_idea_id(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
    ) -> BoardResult<Vec<Comment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM comment \
                 WHERE tenant_id = $tenant_id AND idea_id = $idea_id \
                 ORDER BY created_at DESC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("idea_id", idea_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CommentRow> = result.take(0).map_err(DbError::from)?;

        let mut ids: Vec<String> = rows.iter().map(|r| r.user_id.clone()).collect();
        ids.sort_unstable();
        ids.dedup();
        let users = users_by_ids(&self.db, tenant_id, ids).await?;

        let comments = rows
            .into_iter()
            .map(|row| row.try_into_comment(&users))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(comments)
    }

    async fn add_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> BoardResult<()> {
        if !self.accepts_supporters(tenant_id, idea_id).await? {
            return Ok(());
        }
        ensure_user_in_tenant(&self.db, tenant_id, user_id).await?;

        with_retry("add_supporter", || {
            self.relate_supporter(tenant_id, user_id, idea_id)
        })
        .await?;

        Ok(())
    }

    async fn remove_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> BoardResult<()> {
        if !self.accepts_supporters(tenant_id, idea_id).await? {
            return Ok(());
        }

        with_retry("remove_supporter", || {
            self.unrelate_supporter(tenant_id, user_id, idea_id)
        })
        .await?;

        Ok(())
    }

    async fn supported_by(&self, tenant_id: Uuid, user_id: Uuid) -> BoardResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(out) FROM supports \
                 WHERE tenant_id = $tenant_id \
                 AND in = type::record('user', $user_id)",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;

        let ids = ids
            .iter()
            .map(|id| parse_uuid(id, "idea"))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(ids)
    }

    async fn set_response(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
        input: SetResponse,
    ) -> BoardResult<()> {
        self.find_row(tenant_id, idea_id).await?;
        ensure_user_in_tenant(&self.db, tenant_id, input.user_id).await?;

        with_retry("set_response", || {
            self.write_response(tenant_id, idea_id, &input)
        })
        .await?;

        info!(
            tenant_id = %tenant_id,
            idea_id = %idea_id,
            status = input.status.as_str(),
            "Idea response set"
        );

        Ok(())
    }
}
