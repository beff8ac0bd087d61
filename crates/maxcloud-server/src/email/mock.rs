//! Mock email sender for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EmailError, Sender};

/// Records every invite sent; never fails unless told to.
#[derive(Default)]
pub struct MockSender {
    pub fail: bool,
    invites: Mutex<Vec<InviteCall>>,
}

#[derive(Debug, Clone)]
pub struct InviteCall {
    pub to_email: String,
    pub org_name: String,
    pub invite_token: String,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn last_invite(&self) -> Option<InviteCall> {
        self.invites.lock().await.last().cloned()
    }
}

#[async_trait]
impl Sender for MockSender {
    async fn send_invite(
        &self,
        to_email: &str,
        org_name: &str,
        invite_token: &str,
    ) -> Result<(), EmailError> {
        self.invites.lock().await.push(InviteCall {
            to_email: to_email.to_string(),
            org_name: org_name.to_string(),
            invite_token: invite_token.to_string(),
        });
        if self.fail {
            return Err(EmailError("mock failure".to_string()));
        }
        Ok(())
    }
}
