//! Organization membership and roles.

use serde::{Deserialize, Serialize};

use crate::models::organization::Organization;
use crate::models::user::User;

/// Role of a user within an organization.
///
/// Admin is required for invitation management; member suffices for
/// service operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Admin,
    Member,
}

impl OrgRole {
    pub fn as_str(self) -> &'static str {
        match self {
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(OrgRole::Admin),
            "member" => Some(OrgRole::Member),
            _ => None,
        }
    }
}

/// The authenticated caller's identity within their organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    pub user: User,
    pub organization: Organization,
    pub role: OrgRole,
}
