//! Service domain model — the unit of desired state the reconciler
//! converges onto the substrate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MIN_SCALE: i32 = 0;
pub const DEFAULT_MAX_SCALE: i32 = 10;

/// Current state of a service.
///
/// Transitions only along `pending → ready`, `pending → failed`,
/// `* → deleting`. The reconciler is the sole writer of `ready`/`failed`
/// and the sole remover of `deleting` rows; handlers write `pending` on
/// create and `deleting` on delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Pending,
    Ready,
    Failed,
    Deleting,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Ready => "ready",
            ServiceStatus::Failed => "failed",
            ServiceStatus::Deleting => "deleting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ServiceStatus::Pending),
            "ready" => Some(ServiceStatus::Ready),
            "failed" => Some(ServiceStatus::Failed),
            "deleting" => Some(ServiceStatus::Deleting),
            _ => None,
        }
    }
}

/// A declared container service.
///
/// `name` is unique within its organization; unscoped services
/// (`org_id = None`) share the null-org namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,
    pub name: String,
    pub image: String,
    pub status: ServiceStatus,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    pub min_scale: i32,
    pub max_scale: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for declaring a new service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}
