//! Organization domain model.
//!
//! Organizations are the tenant unit in max-cloud: services, API keys,
//! invitations, and memberships all hang off an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. `name` is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
