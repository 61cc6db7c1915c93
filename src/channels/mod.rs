//! Messaging channel adapters
//!
//! Each channel implements the `Channel` trait to provide unified one-way
//! notification delivery back to senders.

mod whatsapp;

use async_trait::async_trait;

pub use whatsapp::WhatsAppChannel;

use crate::Result;

/// One-way outbound notification channel
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging and provenance
    fn name(&self) -> &'static str;

    /// Send a text message to a channel-specific recipient identifier
    ///
    /// # Errors
    ///
    /// Returns error if delivery fails; callers on the webhook path treat
    /// this as best-effort and discard the error after logging
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;
}
