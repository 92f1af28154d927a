//! Domain models for Ideaboard.
//!
//! These are the core types shared across all crates.

pub mod comment;
pub mod idea;
pub mod tenant;
pub mod user;
