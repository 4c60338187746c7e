//! Database layer
//!
//! SQLite persistence for the engine: connection pool, code-embedded
//! migrations, and one repository per entity. Uniqueness rules (global batch
//! id, one reset token per user, one history row per (user, batch)) are
//! enforced by the schema, not by check-then-insert in application code.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
