//! Ideaboard server: application entry point.
//!
//! Loads configuration, connects to SurrealDB, brings the schema up to
//! date and builds the application context, then runs until interrupted.

mod config;

use ideaboard_core::repository::HealthCheck;
use ideaboard_db::{DbError, DbManager};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};

#[derive(Debug, Error)]
enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database is not healthy")]
    Unhealthy,

    #[error("failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

async fn run() -> Result<(), ServerError> {
    let config = Config::from_env()?;

    let manager = DbManager::connect(&config.db).await?;
    manager.migrate().await?;

    let ctx = manager.context(config.settings);
    if !ctx.health.is_healthy().await {
        return Err(ServerError::Unhealthy);
    }

    tracing::info!(build_time = %ctx.settings.build_time, "Ideaboard storage ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ideaboard=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting Ideaboard server...");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Ideaboard server failed");
        std::process::exit(1);
    }

    tracing::info!("Ideaboard server stopped.");
}
