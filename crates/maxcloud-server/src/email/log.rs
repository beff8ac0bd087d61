//! Log-only email sender for dev mode.

use async_trait::async_trait;
use tracing::info;

use super::{EmailError, Sender};

/// Logs the invitation instead of delivering it. Used in dev mode when
/// no Resend API key is configured; the raw token also appears in the
/// invite response there.
#[derive(Debug, Default)]
pub struct LogSender;

impl LogSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sender for LogSender {
    async fn send_invite(
        &self,
        to_email: &str,
        org_name: &str,
        _invite_token: &str,
    ) -> Result<(), EmailError> {
        info!(to = %to_email, org = %org_name, "dev mode: invite email suppressed");
        Ok(())
    }
}
