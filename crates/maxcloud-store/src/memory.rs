//! In-memory store implementation.
//!
//! Same contracts as the SurrealDB store behind a single coarse
//! read/write lock. Used when no database is configured and as the
//! backing store of the server test suite.

mod auth;
mod service;

use std::collections::{HashMap, HashSet};

use maxcloud_core::models::api_key::ApiKeyInfo;
use maxcloud_core::models::invitation::Invitation;
use maxcloud_core::models::membership::OrgRole;
use maxcloud_core::models::organization::Organization;
use maxcloud_core::models::service::Service;
use maxcloud_core::models::user::User;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub(crate) struct ApiKeyEntry {
    pub(crate) info: ApiKeyInfo,
    pub(crate) hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct InviteTokenEntry {
    pub(crate) invite_id: Uuid,
    pub(crate) hash: String,
}

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) services: HashMap<Uuid, Service>,

    pub(crate) orgs: HashMap<Uuid, Organization>,
    pub(crate) users: HashMap<Uuid, User>,
    /// org id -> user id -> role
    pub(crate) org_members: HashMap<Uuid, HashMap<Uuid, OrgRole>>,
    /// lookup prefix -> candidate entries (prefixes may collide)
    pub(crate) api_keys: HashMap<String, Vec<ApiKeyEntry>>,
    pub(crate) email_index: HashMap<String, Uuid>,
    pub(crate) org_name_index: HashSet<String>,

    pub(crate) invitations: HashMap<Uuid, Invitation>,
    /// token prefix -> candidate entries
    pub(crate) invite_tokens: HashMap<String, Vec<InviteTokenEntry>>,
}

/// Volatile store implementing `ServiceStore` and `AuthStore`.
#[derive(Default)]
pub struct MemoryStore {
    pub(crate) inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
