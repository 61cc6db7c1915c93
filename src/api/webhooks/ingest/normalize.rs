//! Message normalization and eligibility gating
//!
//! Decides whether an inbound message reaches the extraction stage, and in
//! what shape. Ordering matters: structural validation, then the device
//! check, then group gating, then text cleanup.

use std::sync::OnceLock;

use regex::Regex;

use super::IngestPayload;
use crate::config::IngestConfig;

/// A message that passed every gate and is ready for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Where the reply goes: the group JID for group messages, the sender
    /// JID for direct ones. Absent when the payload carried no sender.
    pub reply_to: Option<String>,
    /// Reviewer display name for persisted reviews
    pub display_name: String,
    /// Normalized sender contact for registered-user linking
    pub contact: Option<String>,
    /// Message text after trigger and mention stripping
    pub text: String,
    pub is_group: bool,
}

/// Why a message did not reach extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `message` missing or blank (HTTP 400)
    MissingMessage,
    /// `device` does not match the provisioned identifier (HTTP 400)
    InvalidDevice,
    /// Group message without the trigger token; ignored silently
    NoTrigger,
    /// Nothing left after trigger/mention stripping
    EmptyAfterStrip,
}

/// Outcome of normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Eligible(NormalizedMessage),
    Rejected(Rejection),
}

/// Apply the channel rules to a decoded payload
#[must_use]
pub fn normalize(payload: &IngestPayload, config: &IngestConfig) -> Normalized {
    let Some(message) = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
    else {
        return Normalized::Rejected(Rejection::MissingMessage);
    };

    // Shared public endpoint: only the provisioned device may deliver
    let device_ok = config
        .device_id
        .as_deref()
        .is_some_and(|expected| payload.device.as_deref() == Some(expected));
    if !device_ok {
        return Normalized::Rejected(Rejection::InvalidDevice);
    }

    let sender = payload.sender.as_deref().map(str::trim).unwrap_or_default();
    let is_group = !sender.is_empty() && sender.ends_with(&config.group_suffix);

    let text = if is_group {
        // Untriggered group chatter is ignored without a trace
        let Some(rest) = strip_trigger(message, &config.group_trigger) else {
            return Normalized::Rejected(Rejection::NoTrigger);
        };
        rest
    } else {
        message.to_string()
    };

    let text = strip_mentions(&text).trim().to_string();
    if text.is_empty() {
        return Normalized::Rejected(Rejection::EmptyAfterStrip);
    }

    let member = payload
        .member
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let display_name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
        .or_else(|| {
            if is_group {
                member.map(ToString::to_string)
            } else {
                non_empty(sender)
            }
        })
        .unwrap_or_else(|| config.fallback_name.clone());

    let contact = if is_group {
        member.map(ToString::to_string)
    } else {
        non_empty(sender).map(|s| {
            s.strip_suffix(&config.direct_suffix)
                .unwrap_or(&s)
                .to_string()
        })
    };

    Normalized::Eligible(NormalizedMessage {
        reply_to: non_empty(sender),
        display_name,
        contact,
        text,
        is_group,
    })
}

/// Strip a case-insensitive trigger token prefix, returning the remainder
fn strip_trigger(text: &str, trigger: &str) -> Option<String> {
    let prefix = text.get(..trigger.len())?;
    if prefix.eq_ignore_ascii_case(trigger) {
        Some(text[trigger.len()..].trim_start().to_string())
    } else {
        None
    }
}

/// Remove `@<digits>` mention tokens
fn strip_mentions(text: &str) -> String {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    let re = MENTION.get_or_init(|| Regex::new(r"@\d+").expect("static mention pattern"));
    re.replace_all(text, "").into_owned()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IngestConfig {
        IngestConfig {
            device_id: Some("minaret-device-01".to_string()),
            group_trigger: "/review".to_string(),
            group_suffix: "@g.us".to_string(),
            direct_suffix: "@s.whatsapp.net".to_string(),
            fallback_name: "Hamba Allah".to_string(),
        }
    }

    fn payload(message: &str, sender: &str) -> IngestPayload {
        IngestPayload {
            message: Some(message.to_string()),
            device: Some("minaret-device-01".to_string()),
            sender: Some(sender.to_string()),
            name: None,
            member: None,
        }
    }

    fn expect_eligible(normalized: Normalized) -> NormalizedMessage {
        match normalized {
            Normalized::Eligible(msg) => msg,
            Normalized::Rejected(r) => panic!("expected eligible, got {r:?}"),
        }
    }

    #[test]
    fn test_missing_message() {
        let mut p = payload("  ", "628123456789@s.whatsapp.net");
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::MissingMessage)
        );

        p.message = None;
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::MissingMessage)
        );
    }

    #[test]
    fn test_invalid_device() {
        let mut p = payload("halo", "628123456789@s.whatsapp.net");
        p.device = Some("other-device".to_string());
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::InvalidDevice)
        );

        p.device = None;
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::InvalidDevice)
        );
    }

    #[test]
    fn test_group_without_trigger_ignored() {
        let p = payload("hello everyone", "120363012345@g.us");
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::NoTrigger)
        );
    }

    #[test]
    fn test_group_trigger_stripped_case_insensitive() {
        let p = payload(
            "/REVIEW Masjid Al-Falah bagus banget",
            "120363012345@g.us",
        );
        let msg = expect_eligible(normalize(&p, &config()));
        assert_eq!(msg.text, "Masjid Al-Falah bagus banget");
        assert!(msg.is_group);
    }

    #[test]
    fn test_direct_needs_no_trigger() {
        let p = payload("Masjid Al-Falah bagus banget", "628123456789@s.whatsapp.net");
        let msg = expect_eligible(normalize(&p, &config()));
        assert_eq!(msg.text, "Masjid Al-Falah bagus banget");
        assert!(!msg.is_group);
    }

    #[test]
    fn test_mentions_stripped() {
        let p = payload(
            "/review @628111222333 Masjid Salman adem @628444555666",
            "120363012345@g.us",
        );
        let msg = expect_eligible(normalize(&p, &config()));
        assert_eq!(msg.text, "Masjid Salman adem");
    }

    #[test]
    fn test_empty_after_strip() {
        let p = payload("/review @628111222333", "120363012345@g.us");
        assert_eq!(
            normalize(&p, &config()),
            Normalized::Rejected(Rejection::EmptyAfterStrip)
        );
    }

    #[test]
    fn test_display_name_precedence() {
        // Explicit name wins
        let mut p = payload("halo masjid istiqlal", "628123456789@s.whatsapp.net");
        p.name = Some("Budi".to_string());
        assert_eq!(expect_eligible(normalize(&p, &config())).display_name, "Budi");

        // Direct message falls back to the sender identifier
        p.name = None;
        assert_eq!(
            expect_eligible(normalize(&p, &config())).display_name,
            "628123456789@s.whatsapp.net"
        );

        // Group message falls back to the member identifier
        let mut p = payload("/review masjid istiqlal megah", "120363012345@g.us");
        p.member = Some("628123456789".to_string());
        assert_eq!(
            expect_eligible(normalize(&p, &config())).display_name,
            "628123456789"
        );

        // Nothing at all: fixed placeholder
        p.member = None;
        assert_eq!(
            expect_eligible(normalize(&p, &config())).display_name,
            "Hamba Allah"
        );
    }

    #[test]
    fn test_contact_normalization() {
        // Direct: server suffix removed
        let p = payload("masjid istiqlal megah", "628123456789@s.whatsapp.net");
        assert_eq!(
            expect_eligible(normalize(&p, &config())).contact.as_deref(),
            Some("628123456789")
        );

        // Group: member identifier as-is
        let mut p = payload("/review masjid istiqlal megah", "120363012345@g.us");
        p.member = Some("628123456789".to_string());
        let msg = expect_eligible(normalize(&p, &config()));
        assert_eq!(msg.contact.as_deref(), Some("628123456789"));
        assert_eq!(msg.reply_to.as_deref(), Some("120363012345@g.us"));
    }
}
