//! No-op orchestrator for substrate-less execution.
//!
//! Reports every service as ready with a deterministic URL and
//! fabricates log lines. Used for local development and the test
//! suites.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use maxcloud_core::models::service::{Service, ServiceStatus};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::{DeployResult, LogOptions, LogStream, Orchestrator, OrchestratorError};

const LOG_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct NoopOrchestrator;

impl NoopOrchestrator {
    pub fn new() -> Self {
        Self
    }

    fn url_for(svc: &Service) -> String {
        format!("https://{}.maxcloud.dev", svc.name)
    }
}

#[async_trait]
impl Orchestrator for NoopOrchestrator {
    async fn deploy(&self, svc: &Service) -> Result<DeployResult, OrchestratorError> {
        info!(name = %svc.name, image = %svc.image, "noop: deploy");
        Ok(DeployResult {
            status: ServiceStatus::Ready,
            url: Self::url_for(svc),
        })
    }

    async fn remove(&self, svc: &Service) -> Result<(), OrchestratorError> {
        info!(name = %svc.name, "noop: remove");
        Ok(())
    }

    async fn status(&self, svc: &Service) -> Result<DeployResult, OrchestratorError> {
        Ok(DeployResult {
            status: ServiceStatus::Ready,
            url: Self::url_for(svc),
        })
    }

    async fn logs(&self, svc: &Service, opts: LogOptions) -> Result<LogStream, OrchestratorError> {
        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let name = svc.name.clone();
        let tail = if opts.tail == 0 { 100 } else { opts.tail };

        tokio::spawn(async move {
            if !opts.follow {
                for i in 1..=tail {
                    let line = fabricated_line(i, &name);
                    if tx.send(line).await.is_err() {
                        return;
                    }
                }
                return;
            }

            // Follow mode: one line per second until the receiver goes
            // away.
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let mut i = 0u64;
            loop {
                i += 1;
                let line = fabricated_line(i, &name);
                if tx.send(line).await.is_err() {
                    return;
                }
                ticker.tick().await;
            }
        });

        Ok(rx)
    }

    async fn create_namespace(&self, org_id: Uuid) -> Result<(), OrchestratorError> {
        info!(%org_id, "noop: create namespace");
        Ok(())
    }

    async fn namespace_exists(&self, org_id: Uuid) -> Result<bool, OrchestratorError> {
        info!(%org_id, "noop: namespace exists check");
        Ok(true)
    }
}

fn fabricated_line(i: u64, name: &str) -> String {
    format!(
        "{} [stdout] noop log line {i} for {name}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
