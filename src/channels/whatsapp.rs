//! `WhatsApp` channel adapter
//!
//! Talks to a self-hosted `WhatsApp` multi-device gateway over its HTTP
//! send API. Unlike the hosted Business API, a device gateway can address
//! both direct JIDs and group JIDs, which the reply path needs.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::Channel;
use crate::{Error, Result};

/// `WhatsApp` device-gateway channel adapter
#[derive(Clone)]
pub struct WhatsAppChannel {
    /// Gateway base URL (e.g. `http://localhost:3000`)
    api_url: String,
    /// Gateway bearer token
    token: SecretString,
    client: Client,
}

impl WhatsAppChannel {
    /// Create a new `WhatsApp` channel adapter
    #[must_use]
    pub fn new(api_url: String, token: SecretString) -> Self {
        Self {
            api_url,
            token,
            client: Client::new(),
        }
    }

    async fn post_message(&self, to: &str, text: &str) -> Result<()> {
        let url = format!("{}/send/message", self.api_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "phone": to,
            "message": text,
        });

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("WhatsApp gateway error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "WhatsApp gateway error: {status} - {body}"
            )));
        }

        tracing::debug!(to, "WhatsApp message sent");
        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.post_message(to, text).await
    }
}
