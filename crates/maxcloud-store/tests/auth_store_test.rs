//! Registration and API key contract tests, run against both store
//! backends (in-memory SurrealDB and the volatile store).

use maxcloud_core::store::AuthStore;
use maxcloud_core::{Ctx, Error};
use maxcloud_store::{MemoryStore, SurrealStore};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory SurrealDB and run migrations.
async fn setup_surreal() -> SurrealStore<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    maxcloud_store::run_migrations(&db).await.unwrap();
    SurrealStore::new(db)
}

// -----------------------------------------------------------------------
// Shared properties
// -----------------------------------------------------------------------

async fn register_returns_raw_key_once(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    assert_eq!(reg.user.email, "a@example.com");
    assert_eq!(reg.organization.name, "Acme");
    assert!(reg.raw_api_key.starts_with("mc_"));

    // The initial key is named "default" and bound to the new org/user.
    let keys = store
        .list_api_keys(&ctx, reg.organization.id)
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].name, "default");
    assert_eq!(keys[0].org_id, reg.organization.id);
    assert_eq!(keys[0].user_id, reg.user.id);
}

async fn register_rejects_duplicates(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let err = store
        .register(&ctx, "a@example.com", "Other Org")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail), "got {err:?}");

    let err = store
        .register(&ctx, "b@example.com", "Acme")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateOrg), "got {err:?}");
}

async fn register_grants_admin_role(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let info = store
        .get_auth_info(&ctx, reg.organization.id, reg.user.id)
        .await
        .unwrap();
    assert_eq!(
        info.role,
        maxcloud_core::models::membership::OrgRole::Admin
    );
    assert_eq!(info.organization.name, "Acme");
    assert_eq!(info.user.email, "a@example.com");
}

async fn validate_accepts_only_the_registered_key(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let info = store
        .validate_api_key(&ctx, &reg.raw_api_key)
        .await
        .unwrap();
    assert_eq!(info.org_id, reg.organization.id);
    assert_eq!(info.user_id, reg.user.id);

    // Malformed, wrong-lexicon, and unknown keys all collapse into
    // KeyNotFound.
    for bad in [
        "",
        "mc_short",
        "mci_0000000000000000000000000000000000000000000000000000000000000000",
        "mc_0000000000000000000000000000000000000000000000000000000000000000",
    ] {
        let err = store.validate_api_key(&ctx, bad).await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound), "{bad:?} gave {err:?}");
    }
}

async fn created_keys_validate_and_list(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let (raw, info) = store
        .create_api_key(&ctx, reg.organization.id, reg.user.id, "ci")
        .await
        .unwrap();
    assert!(raw.starts_with("mc_"));
    assert_eq!(info.name, "ci");

    let validated = store.validate_api_key(&ctx, &raw).await.unwrap();
    assert_eq!(validated.id, info.id);

    let keys = store
        .list_api_keys(&ctx, reg.organization.id)
        .await
        .unwrap();
    assert_eq!(keys.len(), 2);
}

async fn delete_key_is_org_scoped(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let alice = store.register(&ctx, "a@example.com", "OrgA").await.unwrap();
    let bob = store.register(&ctx, "b@example.com", "OrgB").await.unwrap();

    let (_, key) = store
        .create_api_key(&ctx, alice.organization.id, alice.user.id, "ci")
        .await
        .unwrap();

    // Bob's org cannot delete Alice's key; the failure is
    // indistinguishable from a missing key.
    let err = store
        .delete_api_key(&ctx, bob.organization.id, key.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound), "got {err:?}");

    store
        .delete_api_key(&ctx, alice.organization.id, key.id)
        .await
        .unwrap();

    let err = store
        .delete_api_key(&ctx, alice.organization.id, key.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound), "got {err:?}");
}

async fn deleted_key_no_longer_validates(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let (raw, key) = store
        .create_api_key(&ctx, reg.organization.id, reg.user.id, "ci")
        .await
        .unwrap();
    store
        .delete_api_key(&ctx, reg.organization.id, key.id)
        .await
        .unwrap();

    let err = store.validate_api_key(&ctx, &raw).await.unwrap_err();
    assert!(matches!(err, Error::KeyNotFound), "got {err:?}");
}

async fn last_used_is_recorded(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();
    let info = store
        .validate_api_key(&ctx, &reg.raw_api_key)
        .await
        .unwrap();
    assert!(info.last_used_at.is_none());

    store
        .update_api_key_last_used(&ctx, info.id)
        .await
        .unwrap();

    let info = store
        .validate_api_key(&ctx, &reg.raw_api_key)
        .await
        .unwrap();
    assert!(info.last_used_at.is_some());
}

async fn get_user_by_email_round_trips(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let reg = store.register(&ctx, "a@example.com", "Acme").await.unwrap();

    let user = store
        .get_user_by_email(&ctx, "a@example.com")
        .await
        .unwrap();
    assert_eq!(user.id, reg.user.id);

    let err = store
        .get_user_by_email(&ctx, "missing@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound), "got {err:?}");
}

async fn ensure_dev_org_is_idempotent(store: &dyn AuthStore) {
    let ctx = Ctx::privileged();
    let org_id = uuid::Uuid::new_v4();
    store.ensure_dev_org(&ctx, org_id).await.unwrap();
    store.ensure_dev_org(&ctx, org_id).await.unwrap();
}

// -----------------------------------------------------------------------
// Per-backend entry points
// -----------------------------------------------------------------------

macro_rules! auth_store_tests {
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

auth_store_tests!(
    register_returns_raw_key_once,
    register_rejects_duplicates,
    register_grants_admin_role,
    validate_accepts_only_the_registered_key,
    created_keys_validate_and_list,
    delete_key_is_org_scoped,
    deleted_key_no_longer_validates,
    last_used_is_recorded,
    get_user_by_email_round_trips,
    ensure_dev_org_is_idempotent,
);
