//! max-cloud API server entry point.

use std::sync::Arc;

use maxcloud_core::Ctx;
use maxcloud_core::store::{AuthStore, ServiceStore};
use maxcloud_orchestrator::{NoopOrchestrator, Orchestrator};
use maxcloud_server::email::{LogSender, ResendSender, Sender};
use maxcloud_server::{AppState, Config, Reconciler, build_router};
use maxcloud_store::{DbConfig, DbManager, MemoryStore, SurrealStore};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How long the HTTP server may drain in-flight requests on shutdown.
const DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("maxcloud=info".parse().unwrap()),
        )
        .json()
        .init();

    let config = Config::load();

    let (services, auth): (Arc<dyn ServiceStore>, Arc<dyn AuthStore>) =
        if config.database_url.is_empty() {
            info!("using in-memory store (no DATABASE_URL set)");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        } else {
            let db_config = match DbConfig::from_url(&config.database_url) {
                Ok(db_config) => db_config,
                Err(err) => {
                    error!(error = %err, "invalid DATABASE_URL");
                    std::process::exit(1);
                }
            };
            // Connecting also applies pending schema migrations.
            let manager = match DbManager::connect(&db_config).await {
                Ok(manager) => manager,
                Err(err) => {
                    error!(error = %err, "failed to connect to database");
                    std::process::exit(1);
                }
            };
            info!("using SurrealDB store");
            let store = Arc::new(SurrealStore::new(manager.client().clone()));
            (store.clone(), store)
        };

    if config.dev_mode
        && let Some(dev_org) = config.dev_org_uid
    {
        match auth.ensure_dev_org(&Ctx::privileged(), dev_org).await {
            Ok(()) => info!(org_id = %dev_org, "dev org ensured"),
            Err(err) => error!(error = %err, "failed to ensure dev org"),
        }
    }

    let orchestrator: Arc<dyn Orchestrator> = if config.kubeconfig_path.is_empty() {
        info!("using no-op orchestrator (no KUBECONFIG set)");
        Arc::new(NoopOrchestrator::new())
    } else {
        error!("substrate orchestrator is not available in this build; unset KUBECONFIG");
        std::process::exit(1);
    };

    let email: Arc<dyn Sender> = if !config.resend_api_key.is_empty() {
        info!(from = %config.email_from, "using Resend email sender");
        Arc::new(ResendSender::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
        ))
    } else if config.dev_mode {
        info!("using log-only email sender (dev mode)");
        Arc::new(LogSender::new())
    } else {
        error!("RESEND_API_KEY is required");
        std::process::exit(1);
    };

    let port = config.port;
    let reconcile_interval = config.reconcile_interval;
    let state = AppState {
        services: services.clone(),
        auth,
        orchestrator: orchestrator.clone(),
        email,
        config: Arc::new(config),
    };

    // One signal listener fans out to the reconciler and the HTTP
    // server through a watch channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutting down server");
        let _ = shutdown_tx.send(true);
    });

    let reconciler = Reconciler::new(services, orchestrator, reconcile_interval);
    let reconciler_shutdown = shutdown_rx.clone();
    let reconciler_handle = tokio::spawn(async move {
        reconciler.run(reconciler_shutdown).await;
    });
    info!(interval = ?reconcile_interval, "reconciler started");

    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, port, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(port, "starting API server");

    let mut drain_shutdown = shutdown_rx.clone();
    let mut force_shutdown = shutdown_rx;
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        let _ = drain_shutdown.changed().await;
    });

    // Long-lived log streams must not hold the drain open forever.
    let forced = async move {
        let _ = force_shutdown.changed().await;
        tokio::time::sleep(DRAIN_TIMEOUT).await;
    };

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!(error = %err, "server failed");
                std::process::exit(1);
            }
        }
        _ = forced => {
            error!("forced shutdown, drain timeout exceeded");
        }
    }

    let _ = reconciler_handle.await;
    info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
