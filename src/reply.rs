//! Summary reply composition
//!
//! One reply covers the whole batch of candidates from a message. The
//! branches cover every combination of {created, unresolved}; dispatch is
//! the channel's concern, not this module's.

use std::fmt::Write as _;

/// Compose the batch summary sent back to the sender
///
/// `created` holds catalog names of persisted reviews; `unresolved` holds
/// the entity names that matched nothing. Both empty means the extraction
/// found no reviewable content, which gets a format-guidance message.
#[must_use]
pub fn compose_summary(created: &[String], unresolved: &[String]) -> String {
    match (created.is_empty(), unresolved.is_empty()) {
        (false, false) => {
            let mut msg = String::from(
                "Terima kasih! Ulasan kamu sudah kami terima dan menunggu moderasi:\n",
            );
            push_list(&mut msg, created);
            msg.push_str("\nBeberapa masjid belum ada di direktori kami:\n");
            push_list(&mut msg, unresolved);
            msg.push_str("\nTim kami akan segera menambahkannya.");
            msg
        }
        (false, true) => {
            let mut msg = String::from(
                "Terima kasih! Ulasan kamu sudah kami terima dan menunggu moderasi:\n",
            );
            push_list(&mut msg, created);
            msg
        }
        (true, false) => {
            let mut msg =
                String::from("Maaf, masjid berikut belum kami temukan di direktori:\n");
            push_list(&mut msg, unresolved);
            msg.push_str("\nTim kami akan segera menambahkannya.");
            msg
        }
        (true, true) => String::from(
            "Hmm, kami tidak menemukan ulasan masjid di pesan kamu. \
             Contoh format: \"Masjid Al-Falah Surabaya bagus banget, rating 5/5\".",
        ),
    }
}

fn push_list(msg: &mut String, names: &[String]) {
    for name in names {
        let _ = writeln!(msg, "- {name}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_created_only() {
        let msg = compose_summary(&names(&["Masjid Al Falah"]), &[]);
        assert!(msg.contains("Terima kasih"));
        assert!(msg.contains("- Masjid Al Falah"));
        assert!(!msg.contains("belum"));
    }

    #[test]
    fn test_unresolved_only() {
        let msg = compose_summary(&[], &names(&["Masjid Antah Berantah"]));
        assert!(msg.starts_with("Maaf"));
        assert!(msg.contains("- Masjid Antah Berantah"));
        assert!(msg.contains("menambahkannya"));
    }

    #[test]
    fn test_mixed_batch() {
        let msg = compose_summary(
            &names(&["Masjid Istiqlal"]),
            &names(&["Masjid Antah Berantah"]),
        );
        assert!(msg.contains("- Masjid Istiqlal"));
        assert!(msg.contains("- Masjid Antah Berantah"));
        assert!(msg.contains("Terima kasih"));
        assert!(msg.contains("menambahkannya"));
    }

    #[test]
    fn test_empty_batch_gets_guidance() {
        let msg = compose_summary(&[], &[]);
        assert!(msg.contains("Contoh format"));
    }
}
