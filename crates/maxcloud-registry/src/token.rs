//! HS256 JWT issuance for the registry token protocol.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::scope::AccessEntry;

/// Issuer claim of every registry token.
pub const ISSUER: &str = "max-cloud";

/// Claims embedded in a registry bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryClaims {
    pub iss: String,
    /// Subject is the organization id.
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    pub access: Vec<AccessEntry>,
}

/// A signed token plus the metadata the token endpoint returns.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
    pub issued_at: DateTime<Utc>,
}

/// Mint a signed registry token for an organization.
pub fn issue_registry_token(
    org_id: Uuid,
    audience: &str,
    access: Vec<AccessEntry>,
    secret: &str,
    expiry: Duration,
) -> Result<IssuedToken, RegistryError> {
    if secret.is_empty() {
        return Err(RegistryError::SecretNotConfigured);
    }

    let now = Utc::now();
    let expires_in = expiry.as_secs();
    let claims = RegistryClaims {
        iss: ISSUER.to_string(),
        sub: org_id.to_string(),
        aud: audience.to_string(),
        exp: now.timestamp() + expires_in as i64,
        nbf: now.timestamp(),
        iat: now.timestamp(),
        access,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    let token = jsonwebtoken::encode(&Header::default(), &claims, &key)
        .map_err(|e| RegistryError::Encoding(e.to_string()))?;

    Ok(IssuedToken {
        token,
        expires_in,
        issued_at: now,
    })
}
