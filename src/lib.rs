//! Minaret Gateway - WhatsApp review ingestion for a community mosque directory
//!
//! This library provides the core functionality for the Minaret gateway:
//! - Webhook ingestion of chat messages from a provisioned WhatsApp device
//! - LLM-backed extraction of structured mosque reviews from free text
//! - Fuzzy catalog matching and moderation-pending review persistence
//! - Batch summary replies back to the sender
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              WhatsApp device gateway                 │
//! │        (webhook in  │  send-message API out)         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Minaret Gateway                       │
//! │  Normalize │ Extract │ Parse │ Match │ Persist      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │       SQLite (catalog, reviews, request log)         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod channels;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod reply;

pub use channels::WhatsAppChannel;
pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use extract::{Extractor, ParseOutcome, ReviewCandidate};
