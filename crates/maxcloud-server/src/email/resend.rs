//! Resend-backed email delivery.

use async_trait::async_trait;
use serde::Serialize;

use super::{EmailError, Sender};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Sends invitation mail through the Resend API.
pub struct ResendSender {
    client: reqwest::Client,
    api_key: String,
    from_addr: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

impl ResendSender {
    pub fn new(api_key: String, from_addr: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_addr,
        }
    }
}

#[async_trait]
impl Sender for ResendSender {
    async fn send_invite(
        &self,
        to_email: &str,
        org_name: &str,
        invite_token: &str,
    ) -> Result<(), EmailError> {
        let html = format!(
            "<h2>Invitation to {org_name} on max-cloud</h2>\
             <p>You have been invited to join the organization \
             <strong>{org_name}</strong> on max-cloud.</p>\
             <p>Use the following command to accept the invitation:</p>\
             <pre>maxcloud auth accept-invite --token {invite_token}</pre>\
             <p>The token is valid for 7 days.</p>"
        );

        let body = SendEmailRequest {
            from: &self.from_addr,
            to: [to_email],
            subject: format!("Invitation to {org_name} on max-cloud"),
            html,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmailError(format!(
                "Resend returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
