//! Error types for the max-cloud control plane.

use thiserror::Error;

/// Caller-facing error taxonomy.
///
/// The store returns these values directly; the handler tier maps them
/// to HTTP status codes. Cross-tenant access and missing entities are
/// deliberately indistinguishable (`NotFound`), as are the many ways an
/// API key or invitation can fail to resolve (`KeyNotFound`,
/// `InviteNotFound`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("service name already exists in this organization")]
    DuplicateService,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("organization name already taken")]
    DuplicateOrg,

    #[error("api key not found")]
    KeyNotFound,

    #[error("invite not found")]
    InviteNotFound,

    #[error("invite expired")]
    InviteExpired,

    #[error("user is already a member of this organization")]
    AlreadyMember,

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
