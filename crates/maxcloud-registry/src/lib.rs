//! max-cloud Registry — scope-limited bearer tokens for a Docker-style
//! image registry's token protocol.
//!
//! The API server authenticates the caller and hands the tenant's org
//! id to this crate, which parses the requested scopes, enforces
//! repository ownership, and mints an HS256 JWT the registry trusts.

mod error;
pub mod scope;
pub mod token;

pub use error::RegistryError;
pub use scope::{AccessEntry, parse_scope, validate_scope};
pub use token::{ISSUER, IssuedToken, issue_registry_token};
