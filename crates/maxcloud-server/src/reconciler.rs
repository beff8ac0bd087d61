//! The reconciliation loop.
//!
//! Every tick, the loop takes the privileged (untenanted) view of all
//! services and converges each one: `pending` services are deployed
//! and observed until the substrate reports ready or failed,
//! `deleting` services are removed from the substrate and then from
//! the store. Every per-service error is logged and retried on the
//! next tick; the loop itself never fails.

use std::sync::Arc;
use std::time::Duration;

use maxcloud_core::Ctx;
use maxcloud_core::models::service::{Service, ServiceStatus};
use maxcloud_core::store::ServiceStore;
use maxcloud_orchestrator::{Orchestrator, OrchestratorError};
use tokio::sync::watch;
use tracing::{error, info};

pub struct Reconciler {
    store: Arc<dyn ServiceStore>,
    orchestrator: Arc<dyn Orchestrator>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ServiceStore>,
        orchestrator: Arc<dyn Orchestrator>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            interval,
        }
    }

    /// Run the loop until the shutdown signal fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("reconciler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// A single reconcile pass over all services.
    pub async fn run_once(&self) {
        let ctx = Ctx::privileged();
        let services = match self.store.list(&ctx).await {
            Ok(services) => services,
            Err(err) => {
                error!(error = %err, "reconciler: failed to list services");
                return;
            }
        };

        for svc in services {
            match svc.status {
                ServiceStatus::Pending => self.reconcile_pending(svc).await,
                ServiceStatus::Deleting => self.reconcile_deleting(svc).await,
                ServiceStatus::Ready | ServiceStatus::Failed => {}
            }
        }
    }

    async fn reconcile_pending(&self, svc: Service) {
        let result = match self.orchestrator.status(&svc).await {
            Ok(result) => result,
            Err(OrchestratorError::NotFound) => {
                // Not deployed yet. Deploy now and observe readiness on
                // a later tick.
                match self.orchestrator.deploy(&svc).await {
                    Ok(_) => info!(id = %svc.id, "reconciler: deployed to substrate"),
                    Err(err) => {
                        error!(error = %err, id = %svc.id, "reconciler: deploy failed");
                    }
                }
                return;
            }
            Err(err) => {
                error!(error = %err, id = %svc.id, "reconciler: status check failed");
                return;
            }
        };

        if result.status != svc.status || result.url != svc.url {
            let ctx = Ctx::privileged();
            if let Err(err) = self
                .store
                .update_status(&ctx, svc.id, result.status, &result.url)
                .await
            {
                error!(error = %err, id = %svc.id, "reconciler: update status failed");
                return;
            }
            info!(
                id = %svc.id,
                status = result.status.as_str(),
                url = %result.url,
                "reconciler: status updated"
            );
        }
    }

    async fn reconcile_deleting(&self, svc: Service) {
        if let Err(err) = self.orchestrator.remove(&svc).await {
            error!(error = %err, id = %svc.id, "reconciler: remove failed");
            return;
        }

        let ctx = Ctx::privileged();
        if let Err(err) = self.store.delete(&ctx, svc.id).await {
            error!(error = %err, id = %svc.id, "reconciler: delete from store failed");
            return;
        }

        info!(id = %svc.id, "reconciler: service deleted");
    }
}
