//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation: a record
//! owned by another tenant is reported as not found.

use uuid::Uuid;

use crate::error::BoardResult;
use crate::models::{
    comment::{Comment, CreateComment},
    idea::{CreateIdea, Idea, SetResponse, UpdateIdea},
    tenant::{CreateTenant, Tenant},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the subdomain is taken.
    fn create(&self, input: CreateTenant) -> impl Future<Output = BoardResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BoardResult<Tenant>> + Send;
    fn get_by_subdomain(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = BoardResult<Tenant>> + Send;
    fn is_subdomain_available(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = BoardResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the email is taken in the tenant.
    fn create(&self, input: CreateUser) -> impl Future<Output = BoardResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BoardResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = BoardResult<User>> + Send;
    /// Same email rule as `create`.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = BoardResult<User>> + Send;
}

pub trait IdeaRepository: Send + Sync {
    /// Store a new idea with the next number of its tenant, a unique slug,
    /// status `New` and no supporters.
    fn save(&self, input: CreateIdea) -> impl Future<Output = BoardResult<Idea>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BoardResult<Idea>> + Send;
    fn get_by_number(
        &self,
        tenant_id: Uuid,
        number: u32,
    ) -> impl Future<Output = BoardResult<Idea>> + Send;
    /// All ideas of the tenant, ordered by number.
    fn get_all(&self, tenant_id: Uuid) -> impl Future<Output = BoardResult<Vec<Idea>>> + Send;
    /// Changing the title recomputes the slug.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateIdea,
    ) -> impl Future<Output = BoardResult<Idea>> + Send;

    fn add_comment(
        &self,
        input: CreateComment,
    ) -> impl Future<Output = BoardResult<Comment>> + Send;
    /// Comments of an idea, newest first.
    fn get_comments_by_idea_id(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
    ) -> impl Future<Output = BoardResult<Vec<Comment>>> + Send;

    /// Idempotent. Does nothing when the idea is closed.
    fn add_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> impl Future<Output = BoardResult<()>> + Send;
    /// Idempotent. Does nothing when the idea is closed.
    fn remove_supporter(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        idea_id: Uuid,
    ) -> impl Future<Output = BoardResult<()>> + Send;
    /// IDs of the ideas a user currently supports.
    fn supported_by(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = BoardResult<Vec<Uuid>>> + Send;

    fn set_response(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
        input: SetResponse,
    ) -> impl Future<Output = BoardResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

pub trait HealthCheck: Send + Sync {
    /// Whether the backing store is reachable.
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;
}
