//! Domain models for max-cloud.
//!
//! Organizations are the tenancy root; every persistent entity except
//! `User` belongs to exactly one. Services may also exist unscoped (no
//! organization) in substrate-less deployments.

pub mod api_key;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod service;
pub mod user;
