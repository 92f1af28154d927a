//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use ideaboard_core::error::{BoardError, BoardResult};
use ideaboard_core::models::tenant::{CreateTenant, Tenant};
use ideaboard_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    name: String,
    subdomain: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Tenant {
        Tenant {
            id,
            name: self.name,
            subdomain: self.subdomain,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    name: String,
    subdomain: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid(&self.record_id, "tenant")?,
            name: self.name,
            subdomain: self.subdomain,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count_subdomain(&self, subdomain: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE subdomain = $subdomain GROUP ALL",
            )
            .bind(("subdomain", subdomain.to_string()))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> BoardResult<Tenant> {
        if self.count_subdomain(&input.subdomain).await? > 0 {
            return Err(BoardError::AlreadyExists {
                entity: format!("tenant with subdomain {}", input.subdomain),
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 name = $name, subdomain = $subdomain",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("subdomain", input.subdomain))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn get_by_id(&self, id: Uuid) -> BoardResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn get_by_subdomain(&self, subdomain: &str) -> BoardResult<Tenant> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant WHERE subdomain = $subdomain",
            )
            .bind(("subdomain", subdomain.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", format!("subdomain={subdomain}")))?;

        Ok(row.try_into_tenant()?)
    }

    async fn is_subdomain_available(&self, subdomain: &str) -> BoardResult<bool> {
        Ok(self.count_subdomain(subdomain).await? == 0)
    }
}
