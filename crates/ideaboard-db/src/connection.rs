//! Connecting the server to its SurrealDB instance.

use ideaboard_core::AppSettings;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::context::{SurrealContext, build_context};
use crate::error::DbError;
use crate::schema::{current_version, latest_version, run_migrations};

/// Where the board's data lives and how to sign in to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// `host:port` of the SurrealDB WebSocket endpoint.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "ideaboard".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// An authenticated handle shared by every repository of one board.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in as root and select the configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Connected to SurrealDB");

        Ok(Self { db })
    }

    /// Bring the schema up to date and return the version it started at.
    pub async fn migrate(&self) -> Result<u32, DbError> {
        let from = current_version(&self.db).await?;
        run_migrations(&self.db).await?;

        info!(from, to = latest_version(), "Schema ready");

        Ok(from)
    }

    /// Wire every repository to this connection.
    pub fn context(&self, settings: AppSettings) -> SurrealContext<Client> {
        build_context(self.db.clone(), settings)
    }
}
