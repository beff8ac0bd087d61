//! Store trait definitions for data access abstraction.
//!
//! Every operation takes a [`Ctx`] as its first argument. When the
//! context carries a tenant, the operation observes and affects only
//! entities of that organization; when it does not, no filter applies
//! (the privileged reconciler view). This invariant is non-negotiable
//! and is the primary property of the store test suites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::Ctx;
use crate::error::Result;
use crate::models::api_key::ApiKeyInfo;
use crate::models::invitation::Invitation;
use crate::models::membership::{AuthInfo, OrgRole};
use crate::models::organization::Organization;
use crate::models::service::{DeployRequest, Service, ServiceStatus};
use crate::models::user::User;

/// Result of a successful registration. `raw_api_key` is visible here
/// and nowhere else.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub organization: Organization,
    pub raw_api_key: String,
}

/// Result of a successfully accepted invitation.
#[derive(Debug)]
pub struct AcceptedInvite {
    pub user: User,
    pub organization: Organization,
    pub role: OrgRole,
    pub raw_api_key: String,
}

/// Persistence of service desired state.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Declare a new service with status `pending`. Stamps the tenant's
    /// org id when the context carries one. Fails with
    /// `DuplicateService` when the `(name, org)` pair is taken.
    async fn create(&self, ctx: &Ctx, req: DeployRequest) -> Result<Service>;

    async fn get(&self, ctx: &Ctx, id: Uuid) -> Result<Service>;

    async fn get_by_name(&self, ctx: &Ctx, name: &str) -> Result<Service>;

    async fn list(&self, ctx: &Ctx) -> Result<Vec<Service>>;

    /// Remove a service row. Only the reconciler calls this once the
    /// orchestrator has confirmed removal.
    async fn delete(&self, ctx: &Ctx, id: Uuid) -> Result<()>;

    /// Set status and URL. An empty `url` leaves the stored value
    /// unchanged.
    async fn update_status(
        &self,
        ctx: &Ctx,
        id: Uuid,
        status: ServiceStatus,
        url: &str,
    ) -> Result<()>;
}

/// Persistence of organizations, users, memberships, API keys, and
/// invitations.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Create organization + user + admin membership + initial API key
    /// (named "default") atomically. Fails with `DuplicateEmail` or
    /// `DuplicateOrg`.
    async fn register(&self, ctx: &Ctx, email: &str, org_name: &str) -> Result<Registration>;

    /// Resolve a raw API key to its metadata. Any failure (malformed
    /// input, unknown prefix, hash mismatch, expiry) is `KeyNotFound`.
    async fn validate_api_key(&self, ctx: &Ctx, raw_key: &str) -> Result<ApiKeyInfo>;

    /// Mint a new key bound to an existing membership (the caller has
    /// already verified it). Returns the raw secret exactly once.
    async fn create_api_key(
        &self,
        ctx: &Ctx,
        org_id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<(String, ApiKeyInfo)>;

    async fn list_api_keys(&self, ctx: &Ctx, org_id: Uuid) -> Result<Vec<ApiKeyInfo>>;

    /// Delete a key of this organization. A key that is absent or owned
    /// by a different organization is indistinguishably `KeyNotFound`.
    async fn delete_api_key(&self, ctx: &Ctx, org_id: Uuid, key_id: Uuid) -> Result<()>;

    /// Advisory last-used timestamp update; losses are tolerated.
    async fn update_api_key_last_used(&self, ctx: &Ctx, key_id: Uuid) -> Result<()>;

    /// Join user, organization, and membership role. `NotFound` when
    /// the membership is absent.
    async fn get_auth_info(&self, ctx: &Ctx, org_id: Uuid, user_id: Uuid) -> Result<AuthInfo>;

    /// Create a pending invitation. Fails with `AlreadyMember` when the
    /// invited email already belongs to the organization. Returns the
    /// raw token exactly once.
    async fn create_invite(
        &self,
        ctx: &Ctx,
        org_id: Uuid,
        email: &str,
        role: OrgRole,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(Invitation, String)>;

    /// Consume a pending invitation: create the user if the email is
    /// new, add the membership, issue a default API key, and mark the
    /// invitation accepted, all atomically. A second call with the
    /// same token is `InviteNotFound`; a past-expiry token is
    /// `InviteExpired` (and flips the status to `expired`).
    async fn accept_invite(&self, ctx: &Ctx, raw_token: &str) -> Result<AcceptedInvite>;

    /// Pending invitations of the organization.
    async fn list_invites(&self, ctx: &Ctx, org_id: Uuid) -> Result<Vec<Invitation>>;

    /// Revoke a pending invitation. Anything else (absent, wrong org,
    /// already terminal) is `InviteNotFound`.
    async fn revoke_invite(&self, ctx: &Ctx, org_id: Uuid, invite_id: Uuid) -> Result<()>;

    async fn get_user_by_email(&self, ctx: &Ctx, email: &str) -> Result<User>;

    /// Idempotently create the fixed dev-mode organization.
    async fn ensure_dev_org(&self, ctx: &Ctx, org_id: Uuid) -> Result<()>;
}
