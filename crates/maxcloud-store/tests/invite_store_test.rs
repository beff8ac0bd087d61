//! Invitation lifecycle tests, run against both store backends.

use chrono::{Duration, Utc};
use maxcloud_core::models::invitation::InviteStatus;
use maxcloud_core::models::membership::OrgRole;
use maxcloud_core::store::AuthStore;
use maxcloud_core::{Ctx, Error};
use maxcloud_store::{MemoryStore, SurrealStore};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup_surreal() -> SurrealStore<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    maxcloud_store::run_migrations(&db).await.unwrap();
    SurrealStore::new(db)
}

async fn seed_org(store: &dyn AuthStore) -> maxcloud_core::store::Registration {
    store
        .register(&Ctx::privileged(), "admin@example.com", "Acme")
        .await
        .unwrap()
}

// -----------------------------------------------------------------------
// Shared properties
// -----------------------------------------------------------------------

async fn create_invite_returns_pending_invitation(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;
    let expires_at = Utc::now() + Duration::hours(1);

    let (invite, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            expires_at,
        )
        .await
        .unwrap();

    assert!(token.starts_with("mci_"));
    assert_eq!(invite.status, InviteStatus::Pending);
    assert_eq!(invite.org_name, "Acme");
    assert_eq!(invite.email, "carol@example.com");
    assert_eq!(invite.invited_by, reg.user.id);

    let pending = store
        .list_invites(&ctx, reg.organization.id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, invite.id);
}

async fn invite_rejected_for_existing_member(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;

    let err = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "admin@example.com",
            OrgRole::Member,
            reg.user.id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyMember), "got {err:?}");
}

async fn accept_creates_user_membership_and_key(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;

    let (_, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

    let accepted = store.accept_invite(&ctx, &token).await.unwrap();
    assert_eq!(accepted.user.email, "carol@example.com");
    assert_eq!(accepted.organization.id, reg.organization.id);
    assert_eq!(accepted.role, OrgRole::Member);
    assert!(accepted.raw_api_key.starts_with("mc_"));

    // The fresh key authenticates as Carol within Acme.
    let info = store
        .validate_api_key(&ctx, &accepted.raw_api_key)
        .await
        .unwrap();
    assert_eq!(info.org_id, reg.organization.id);
    assert_eq!(info.user_id, accepted.user.id);

    let auth_info = store
        .get_auth_info(&ctx, reg.organization.id, accepted.user.id)
        .await
        .unwrap();
    assert_eq!(auth_info.role, OrgRole::Member);

    // Accepted invitations disappear from the pending list.
    let pending = store
        .list_invites(&ctx, reg.organization.id)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

async fn accept_is_single_use(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;

    let (_, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

    store.accept_invite(&ctx, &token).await.unwrap();

    let err = store.accept_invite(&ctx, &token).await.unwrap_err();
    assert!(matches!(err, Error::InviteNotFound), "got {err:?}");
}

async fn accept_reuses_existing_user(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;
    let other = store
        .register(&ctx, "carol@example.com", "Carols Org")
        .await
        .unwrap();

    let (_, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Admin,
            reg.user.id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

    let accepted = store.accept_invite(&ctx, &token).await.unwrap();
    // Same user id, now a member of two organizations.
    assert_eq!(accepted.user.id, other.user.id);
    assert_eq!(accepted.role, OrgRole::Admin);
}

async fn expired_invite_transitions_to_expired(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;

    let (invite, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap();

    let err = store.accept_invite(&ctx, &token).await.unwrap_err();
    assert!(matches!(err, Error::InviteExpired), "got {err:?}");

    // The failed accept flipped the stored status; the invitation no
    // longer counts as pending.
    let pending = store
        .list_invites(&ctx, reg.organization.id)
        .await
        .unwrap();
    assert!(pending.iter().all(|inv| inv.id != invite.id));

    // A second attempt finds no pending invitation at all.
    let err = store.accept_invite(&ctx, &token).await.unwrap_err();
    assert!(matches!(err, Error::InviteNotFound), "got {err:?}");
}

async fn revoke_is_pending_only_and_org_scoped(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;
    let other = store
        .register(&ctx, "other@example.com", "Other")
        .await
        .unwrap();

    let (invite, token) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

    // Another organization cannot revoke it.
    let err = store
        .revoke_invite(&ctx, other.organization.id, invite.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InviteNotFound), "got {err:?}");

    store
        .revoke_invite(&ctx, reg.organization.id, invite.id)
        .await
        .unwrap();

    // Revoked invitations cannot be accepted or revoked again.
    let err = store.accept_invite(&ctx, &token).await.unwrap_err();
    assert!(matches!(err, Error::InviteNotFound), "got {err:?}");
    let err = store
        .revoke_invite(&ctx, reg.organization.id, invite.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InviteNotFound), "got {err:?}");
}

async fn repeated_invites_mint_fresh_tokens(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = seed_org(store).await;
    let expires_at = Utc::now() + Duration::hours(1);

    let (first, token_a) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            expires_at,
        )
        .await
        .unwrap();
    let (second, token_b) = store
        .create_invite(
            &ctx,
            reg.organization.id,
            "carol@example.com",
            OrgRole::Member,
            reg.user.id,
            expires_at,
        )
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(token_a, token_b);
}

// -----------------------------------------------------------------------
// Per-backend entry points
// -----------------------------------------------------------------------

macro_rules! invite_store_tests {
    ($($name:ident),* $(,)?) => {
        mod surreal_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    let store = setup_surreal().await;
                    super::$name(&store).await;
                }
            )*
        }

        mod memory_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    let store = MemoryStore::new();
                    super::$name(&store).await;
                }
            )*
        }
    };
}

invite_store_tests!(
    create_invite_returns_pending_invitation,
    invite_rejected_for_existing_member,
    accept_creates_user_membership_and_key,
    accept_is_single_use,
    accept_reuses_existing_user,
    expired_invite_transitions_to_expired,
    revoke_is_pending_only_and_org_scoped,
    repeated_invites_mint_fresh_tokens,
);
