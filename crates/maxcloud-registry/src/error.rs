//! Registry token error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No signing secret is configured; token requests cannot be
    /// served.
    #[error("registry signing secret not configured")]
    SecretNotConfigured,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}
