//! max-cloud Store — durable (SurrealDB) and volatile (in-memory)
//! implementations of the core store traits.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`DbManager`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - [`SurrealStore`] and [`MemoryStore`], both implementing
//!   `ServiceStore` and `AuthStore` with identical contracts
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod memory;
mod schema;
pub mod surreal;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use memory::MemoryStore;
pub use schema::run_migrations;
pub use surreal::SurrealStore;
