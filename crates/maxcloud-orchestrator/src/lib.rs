//! max-cloud Orchestrator — abstract interface to the container
//! substrate (Knative-on-Kubernetes in production, no-op locally).
//!
//! The core never sees substrate client types; it programs against
//! [`Orchestrator`] and the small result/option structs here.
//! Cancellation is structural: dropping a returned future or a log
//! receiver aborts the underlying work.

pub mod noop;
pub mod substrate;

use async_trait::async_trait;
use maxcloud_core::models::service::{Service, ServiceStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use noop::NoopOrchestrator;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The substrate resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// No pod of the service is in the running phase.
    #[error("no running pods found")]
    NoPods,

    #[error("substrate error: {0}")]
    Substrate(String),
}

/// Result of a deploy or status call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub status: ServiceStatus,
    pub url: String,
}

/// Options for log streaming.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: u64,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            follow: false,
            tail: 100,
        }
    }
}

/// Line-oriented log stream. The channel is bounded so a slow consumer
/// back-pressures the producer; dropping the receiver ends it.
pub type LogStream = mpsc::Receiver<String>;

/// Interface to the container substrate.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Create or update the substrate resource for a service.
    /// Idempotent; readiness is observed later via [`status`].
    ///
    /// [`status`]: Orchestrator::status
    async fn deploy(&self, svc: &Service) -> Result<DeployResult, OrchestratorError>;

    /// Delete the substrate resource. An absent resource is success.
    async fn remove(&self, svc: &Service) -> Result<(), OrchestratorError>;

    /// Read the substrate resource and interpret its readiness
    /// condition. `NotFound` when the resource is absent.
    async fn status(&self, svc: &Service) -> Result<DeployResult, OrchestratorError>;

    /// Stream container stdout/stderr of one running pod, line by line.
    /// `NoPods` when none is running.
    async fn logs(&self, svc: &Service, opts: LogOptions) -> Result<LogStream, OrchestratorError>;

    /// Idempotent namespace provisioning for an organization.
    async fn create_namespace(&self, org_id: Uuid) -> Result<(), OrchestratorError>;

    async fn namespace_exists(&self, org_id: Uuid) -> Result<bool, OrchestratorError>;
}
