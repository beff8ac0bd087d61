//! Invitation email delivery.
//!
//! The core consumes email through the [`Sender`] seam only; delivery
//! itself is an external collaborator.

pub mod log;
pub mod mock;
pub mod resend;

use async_trait::async_trait;
use thiserror::Error;

pub use log::LogSender;
pub use mock::MockSender;
pub use resend::ResendSender;

#[derive(Debug, Error)]
#[error("email delivery failed: {0}")]
pub struct EmailError(pub String);

/// Outbound invitation mail.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send_invite(
        &self,
        to_email: &str,
        org_name: &str,
        invite_token: &str,
    ) -> Result<(), EmailError>;
}
