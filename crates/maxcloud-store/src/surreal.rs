//! SurrealDB implementations of the core store traits.
//!
//! Row structs mirror the schemafull tables; UUIDs travel as strings
//! and record ids come back through `meta::id(id)`. Uniqueness is
//! enforced by the schema's unique indexes and mapped back onto the
//! core error taxonomy by index name.

mod auth;
mod service;

use maxcloud_core::Error;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

/// SurrealDB-backed store implementing both `ServiceStore` and
/// `AuthStore`.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Translate a unique-index violation into the matching taxonomy value.
/// Anything else surfaces as a database error.
fn map_index_violation(err: surrealdb::Error) -> Error {
    let msg = err.to_string();
    if msg.contains("idx_organization_name") {
        Error::DuplicateOrg
    } else if msg.contains("idx_user_email") {
        Error::DuplicateEmail
    } else if msg.contains("idx_service_org_name") {
        Error::DuplicateService
    } else if msg.contains("idx_org_member_org_user") {
        Error::AlreadyMember
    } else {
        DbError::from(err).into()
    }
}
