//! SurrealDB implementation of [`UserRepository`].
//!
//! Also hosts the tenant-scoped user lookups the idea repository uses to
//! attach authors and responders to ideas and comments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ideaboard_core::error::{BoardError, BoardResult};
use ideaboard_core::models::user::{CreateUser, UpdateUser, User, UserRole};
use ideaboard_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    tenant_id: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<UserRole, DbError> {
    UserRole::parse(s).ok_or_else(|| DbError::Decode(format!("unknown user role: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            email: self.email,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            email: self.email,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Load the given users of a tenant, keyed by their stored id string.
///
/// IDs that do not exist in the tenant are simply absent from the map.
pub(crate) async fn users_by_ids<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    ids: Vec<String>,
) -> Result<HashMap<String, User>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE tenant_id = $tenant_id AND meta::id(id) IN $ids",
        )
        .bind(("tenant_id", tenant_id.to_string()))
        .bind(("ids", ids))
        .await?;

    let rows: Vec<UserRowWithId> = result.take(0)?;

    rows.into_iter()
        .map(|row| {
            let key = row.record_id.clone();
            row.try_into_user().map(|user| (key, user))
        })
        .collect()
}

/// Fail with `NotFound` unless the user exists in the tenant.
pub(crate) async fn ensure_user_in_tenant<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<(), DbError> {
    let user_id_str = user_id.to_string();

    let mut result = db
        .query(
            "SELECT count() AS total FROM user \
             WHERE id = type::record('user', $user_id) \
             AND tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("user_id", user_id_str.clone()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;

    let rows: Vec<CountRow> = result.take(0)?;
    if rows.first().map(|r| r.total).unwrap_or(0) == 0 {
        return Err(DbError::not_found("user", user_id_str));
    }

    Ok(())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Fail with `AlreadyExists` when another user of the tenant has `email`.
    async fn ensure_email_free(
        &self,
        tenant_id: Uuid,
        email: &str,
        exclude: Option<Uuid>,
    ) -> BoardResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE tenant_id = $tenant_id AND email = $email \
                 AND meta::id(id) != $exclude GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        if rows.first().map(|r| r.total).unwrap_or(0) > 0 {
            return Err(BoardError::AlreadyExists {
                entity: format!("user with email {email}"),
            });
        }

        Ok(())
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> BoardResult<User> {
        self.ensure_email_free(input.tenant_id, &input.email, None).await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, email = $email, \
                 role = $role",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("role", input.role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> BoardResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_email(&self, tenant_id: Uuid, email: &str) -> BoardResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE tenant_id = $tenant_id AND email = $email",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")))?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateUser) -> BoardResult<User> {
        let id_str = id.to_string();

        if let Some(email) = &input.email {
            self.ensure_email_free(tenant_id, email, Some(id)).await?;
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id)?)
    }
}
