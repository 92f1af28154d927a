//! SurrealDB implementation of [`HealthCheck`].

use ideaboard_core::repository::HealthCheck;
use surrealdb::{Connection, Surreal};
use tracing::warn;

#[derive(Clone)]
pub struct SurrealHealthCheck<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHealthCheck<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HealthCheck for SurrealHealthCheck<C> {
    async fn is_healthy(&self) -> bool {
        match self.db.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "SurrealDB health check failed");
                false
            }
        }
    }
}
