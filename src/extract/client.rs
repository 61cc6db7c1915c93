//! Extraction service client
//!
//! Calls an OpenAI-compatible chat-completions endpoint with a fixed
//! system instruction and returns the raw content string. The response is
//! untrusted; decoding lives in the parser.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const SYSTEM_PROMPT: &str = r#"You extract mosque reviews from chat messages.

Output a JSON array with this structure:
[{"name": "...", "city": "..." or null, "rating": 1-5 or null, "review": "..."}]

Fields:
- name: the mosque name exactly as mentioned
- city: the city or locality if mentioned, else null
- rating: the numeric rating on a 1-5 scale if stated, else null
- review: a short summary of the sender's opinion, in their language

Return ONLY the JSON array, with no surrounding prose or explanation.
If the message contains no mosque review at all, return []."#;

/// Review extraction client
#[derive(Clone)]
pub struct Extractor {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    model: String,
}

impl Extractor {
    /// Create a new extraction client
    ///
    /// `api_url` is the chat-completions base (e.g. `https://api.openai.com/v1`).
    #[must_use]
    pub fn new(api_url: String, api_key: SecretString, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// Run one extraction call for a normalized message
    ///
    /// Returns the raw model output. No retry: a failed call is a terminal
    /// outcome for the current request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Extraction` on transport failures or non-success
    /// responses from the service
    pub async fn extract(&self, message: &str) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f64,
        }

        #[derive(Serialize)]
        struct ChatMessage {
            role: String,
            content: String,
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "extraction API error {status}: {body}"
            )));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("malformed API response: {e}")))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(chars = content.len(), "extraction response received");
        Ok(content)
    }
}
