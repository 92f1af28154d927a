//! Ideaboard Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `ideaboard-core` traits
//!   ([`repository`]) and a context wiring them together
//!   ([`build_context`])
//! - Error types ([`DbError`])

mod connection;
mod context;
mod error;
pub mod repository;
mod retry;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use context::{SurrealContext, build_context};
pub use error::DbError;
pub use schema::{current_version, latest_version, run_migrations, schema_v1};
