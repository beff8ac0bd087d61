//! Reconciler behavior against the no-op orchestrator.

use std::sync::Arc;
use std::time::Duration;

use maxcloud_core::Ctx;
use maxcloud_core::models::service::{DeployRequest, ServiceStatus};
use maxcloud_core::store::ServiceStore;
use maxcloud_orchestrator::NoopOrchestrator;
use maxcloud_server::Reconciler;
use maxcloud_store::MemoryStore;

fn setup() -> (Arc<MemoryStore>, Reconciler) {
    let store = Arc::new(MemoryStore::new());
    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(NoopOrchestrator::new()),
        Duration::from_secs(1),
    );
    (store, reconciler)
}

fn deploy_request(name: &str) -> DeployRequest {
    DeployRequest {
        name: name.to_string(),
        image: "nginx:latest".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn pending_becomes_ready_with_url() {
    let (store, reconciler) = setup();
    let ctx = Ctx::privileged();

    let svc = store.create(&ctx, deploy_request("myapp")).await.unwrap();
    assert_eq!(svc.status, ServiceStatus::Pending);

    reconciler.run_once().await;

    let updated = store.get(&ctx, svc.id).await.unwrap();
    assert_eq!(updated.status, ServiceStatus::Ready);
    assert_eq!(updated.url, "https://myapp.maxcloud.dev");
}

#[tokio::test]
async fn deleting_services_are_removed() {
    let (store, reconciler) = setup();
    let ctx = Ctx::privileged();

    let svc = store.create(&ctx, deploy_request("myapp")).await.unwrap();
    store
        .update_status(&ctx, svc.id, ServiceStatus::Deleting, "")
        .await
        .unwrap();

    reconciler.run_once().await;

    assert!(store.get(&ctx, svc.id).await.is_err());
}

#[tokio::test]
async fn ready_services_are_skipped() {
    let (store, reconciler) = setup();
    let ctx = Ctx::privileged();

    let svc = store.create(&ctx, deploy_request("myapp")).await.unwrap();
    store
        .update_status(
            &ctx,
            svc.id,
            ServiceStatus::Ready,
            "https://myapp.maxcloud.dev",
        )
        .await
        .unwrap();
    let before = store.get(&ctx, svc.id).await.unwrap();

    reconciler.run_once().await;

    let after = store.get(&ctx, svc.id).await.unwrap();
    assert_eq!(after.status, ServiceStatus::Ready);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn failed_services_are_not_redriven() {
    let (store, reconciler) = setup();
    let ctx = Ctx::privileged();

    let svc = store.create(&ctx, deploy_request("myapp")).await.unwrap();
    store
        .update_status(&ctx, svc.id, ServiceStatus::Failed, "")
        .await
        .unwrap();

    reconciler.run_once().await;

    let after = store.get(&ctx, svc.id).await.unwrap();
    assert_eq!(after.status, ServiceStatus::Failed);
}

#[tokio::test]
async fn repeated_passes_converge_everything() {
    let (store, reconciler) = setup();
    let ctx = Ctx::privileged();

    let keep = store.create(&ctx, deploy_request("keep")).await.unwrap();
    let remove = store.create(&ctx, deploy_request("remove")).await.unwrap();
    store
        .update_status(&ctx, remove.id, ServiceStatus::Deleting, "")
        .await
        .unwrap();

    reconciler.run_once().await;
    reconciler.run_once().await;

    let kept = store.get(&ctx, keep.id).await.unwrap();
    assert_eq!(kept.status, ServiceStatus::Ready);
    assert!(store.get(&ctx, remove.id).await.is_err());

    let all = store.list(&ctx).await.unwrap();
    assert_eq!(all.len(), 1);
}
