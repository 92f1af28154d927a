//! SurrealDB-backed [`AppContext`].

use ideaboard_core::{AppContext, AppSettings};
use surrealdb::{Connection, Surreal};

use crate::repository::{
    SurrealHealthCheck, SurrealIdeaRepository, SurrealTenantRepository, SurrealUserRepository,
};

/// Application context with every repository backed by one SurrealDB handle.
pub type SurrealContext<C> = AppContext<
    SurrealHealthCheck<C>,
    SurrealTenantRepository<C>,
    SurrealUserRepository<C>,
    SurrealIdeaRepository<C>,
>;

pub fn build_context<C: Connection>(db: Surreal<C>, settings: AppSettings) -> SurrealContext<C> {
    AppContext {
        health: SurrealHealthCheck::new(db.clone()),
        tenants: SurrealTenantRepository::new(db.clone()),
        users: SurrealUserRepository::new(db.clone()),
        ideas: SurrealIdeaRepository::new(db),
        settings,
    }
}
