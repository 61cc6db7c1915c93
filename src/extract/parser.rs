//! Tolerant decoding of extraction output
//!
//! The extraction service promises a bare JSON array but is not trusted to
//! deliver one: fenced markdown, prose, or malformed items all show up in
//! practice. Decoding yields a tagged outcome — a typed candidate list or
//! an explicit failure variant — never a partially-typed object.

use serde_json::Value;

/// One structured review item extracted from a message, prior to catalog
/// resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate {
    /// Mosque name as mentioned by the sender
    pub name: String,
    /// Locality hint, if the sender mentioned one
    pub city: Option<String>,
    /// Raw rating as extracted; any scale, not yet normalized
    pub rating: Option<f64>,
    /// Summarized review text
    pub review: String,
}

/// Outcome of decoding raw extraction output
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Output was not valid JSON even after fence stripping
    NotJson,
    /// Output parsed but was not an array
    NotArray,
    /// A well-formed (possibly empty) candidate list
    Items(Vec<ReviewCandidate>),
}

/// Decode raw model output into review candidates
#[must_use]
pub fn parse_candidates(raw: &str) -> ParseOutcome {
    let stripped = strip_code_fences(raw);

    let Ok(value) = serde_json::from_str::<Value>(stripped) else {
        return ParseOutcome::NotJson;
    };

    let Value::Array(items) = value else {
        return ParseOutcome::NotArray;
    };

    let candidates = items
        .iter()
        .filter_map(candidate_from_value)
        .collect();

    ParseOutcome::Items(candidates)
}

/// Remove a surrounding markdown code fence, with or without a language tag
fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();

    if let Some(rest) = s.strip_prefix("```") {
        // Drop the opening fence line (which may carry a language tag)
        s = rest.split_once('\n').map_or(rest, |(_, body)| body);
    }
    if let Some(body) = s.trim_end().strip_suffix("```") {
        s = body;
    }

    s.trim()
}

/// Build a candidate from one array element, validating every field
///
/// Items that are not objects, or that lack a usable name, are not
/// actionable and are dropped.
fn candidate_from_value(value: &Value) -> Option<ReviewCandidate> {
    let obj = value.as_object()?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let city = obj
        .get("city")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let rating = obj.get("rating").and_then(rating_from_value);

    let review = obj
        .get("review")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(ReviewCandidate {
        name,
        city,
        rating,
        review,
    })
}

/// Accept a rating as a JSON number or a numeric string
fn rating_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_and_unfenced_decode_identically() {
        let bare = r#"[{"name": "Masjid Al-Falah", "city": null, "rating": 5, "review": "bagus banget"}]"#;
        let fenced = format!("```json\n{bare}\n```");

        assert_eq!(parse_candidates(bare), parse_candidates(&fenced));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\n[]\n```";
        assert_eq!(parse_candidates(raw), ParseOutcome::Items(vec![]));
    }

    #[test]
    fn test_prose_is_not_json() {
        let raw = "I could not find any mosque review in this message.";
        assert_eq!(parse_candidates(raw), ParseOutcome::NotJson);
    }

    #[test]
    fn test_object_is_not_array() {
        let raw = r#"{"name": "Masjid Al-Falah"}"#;
        assert_eq!(parse_candidates(raw), ParseOutcome::NotArray);
    }

    #[test]
    fn test_empty_array_is_distinct() {
        assert_eq!(parse_candidates("[]"), ParseOutcome::Items(vec![]));
    }

    #[test]
    fn test_item_without_name_dropped() {
        let raw = r#"[
            {"city": "Bandung", "rating": 4, "review": "adem"},
            {"name": "  ", "review": "kosong"},
            {"name": "Masjid Salman", "city": "Bandung", "rating": 4, "review": "adem"}
        ]"#;

        let ParseOutcome::Items(items) = parse_candidates(raw) else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Masjid Salman");
    }

    #[test]
    fn test_non_object_items_dropped() {
        let raw = r#"["Masjid Salman", 42, {"name": "Masjid Salman", "review": "adem"}]"#;

        let ParseOutcome::Items(items) = parse_candidates(raw) else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_rating_variants() {
        let raw = r#"[
            {"name": "A1", "rating": 4.5, "review": ""},
            {"name": "B2", "rating": "3", "review": ""},
            {"name": "C3", "rating": "lima", "review": ""},
            {"name": "D4", "review": ""}
        ]"#;

        let ParseOutcome::Items(items) = parse_candidates(raw) else {
            panic!("expected items");
        };
        assert_eq!(items[0].rating, Some(4.5));
        assert_eq!(items[1].rating, Some(3.0));
        assert_eq!(items[2].rating, None);
        assert_eq!(items[3].rating, None);
    }

    #[test]
    fn test_out_of_scale_rating_kept_raw() {
        let raw = r#"[{"name": "Masjid An-Nur", "rating": 8, "review": "8/10"}]"#;

        let ParseOutcome::Items(items) = parse_candidates(raw) else {
            panic!("expected items");
        };
        assert_eq!(items[0].rating, Some(8.0));
    }
}
