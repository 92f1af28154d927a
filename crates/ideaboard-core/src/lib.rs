//! Ideaboard Core: domain models, repository traits and error types
//! shared by the storage layer and the server.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod slug;

pub use context::{AppContext, AppSettings};
pub use error::{BoardError, BoardResult};
