//! API key metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata of an API key. The key hash never appears here; the raw
/// secret is returned exactly once, at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyInfo {
    pub id: Uuid,
    /// Non-secret lookup prefix (first 8 hex chars after `mc_`).
    pub prefix: String,
    pub name: String,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Advisory timestamp, updated asynchronously after authentication.
    /// Lost updates are tolerated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}
