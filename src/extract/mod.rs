//! Review extraction from free-text messages
//!
//! One LLM call turns a normalized chat message into candidate review
//! items; the parser then treats the model output as untrusted text.

mod client;
mod parser;

pub use client::Extractor;
pub use parser::{ParseOutcome, ReviewCandidate, parse_candidates};
