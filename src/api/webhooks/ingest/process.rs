//! Ingestion pipeline: extract, parse, match, persist, reply
//!
//! Runs inline in the webhook request. Candidates are handled one at a
//! time so the reply order mirrors processing order; only the reply
//! dispatch leaves the request path.

use serde_json::{Map, Value, json};

use super::normalize::NormalizedMessage;
use crate::Result;
use crate::api::ApiState;
use crate::channels::Channel as _;
use crate::db::NewReview;
use crate::extract::{ParseOutcome, ReviewCandidate, parse_candidates};
use crate::reply::compose_summary;

/// Terminal pipeline outcome for an eligible message
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Extraction call failed or no extractor is configured
    ExtractionFailed(String),
    /// Extraction output was not JSON
    NotParseable,
    /// Extraction output was JSON but not an array
    NotArray,
    /// Candidates processed; both lists may be empty
    Summary {
        extracted: usize,
        created: Vec<String>,
        unresolved: Vec<String>,
    },
}

/// Run the pipeline for a normalized message
///
/// Stage outputs accumulate in `stages` and are flushed to the request log
/// after each step, so a crash mid-pipeline still leaves the last snapshot.
///
/// # Errors
///
/// Returns error only for failures outside the terminal-outcome taxonomy
/// (e.g. the catalog store going away mid-request); the handler maps those
/// to the catch-all response
pub async fn run(
    state: &ApiState,
    msg: &NormalizedMessage,
    log_id: Option<&str>,
    stages: &mut Map<String, Value>,
) -> Result<PipelineOutcome> {
    let Some(extractor) = &state.extractor else {
        return Ok(PipelineOutcome::ExtractionFailed(
            "extraction service not configured".to_string(),
        ));
    };

    let raw = match extractor.extract(&msg.text).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "extraction call failed");
            return Ok(PipelineOutcome::ExtractionFailed(e.to_string()));
        }
    };

    stages.insert("extraction_raw".to_string(), json!(raw));
    state
        .webhook_logs
        .record(log_id, &Value::Object(stages.clone()));

    let candidates = match parse_candidates(&raw) {
        ParseOutcome::NotJson => {
            tracing::warn!("extraction output was not parseable JSON");
            dispatch_reply(state, msg.reply_to.as_deref(), compose_summary(&[], &[]));
            return Ok(PipelineOutcome::NotParseable);
        }
        ParseOutcome::NotArray => {
            tracing::warn!("extraction output was JSON but not an array");
            dispatch_reply(state, msg.reply_to.as_deref(), compose_summary(&[], &[]));
            return Ok(PipelineOutcome::NotArray);
        }
        ParseOutcome::Items(items) => items,
    };

    stages.insert("extracted".to_string(), json!(candidates.len()));
    state
        .webhook_logs
        .record(log_id, &Value::Object(stages.clone()));

    let (created, unresolved) = resolve_and_persist(state, msg, &candidates)?;

    stages.insert("created".to_string(), json!(created));
    stages.insert("unresolved".to_string(), json!(unresolved));
    state
        .webhook_logs
        .record(log_id, &Value::Object(stages.clone()));

    dispatch_reply(
        state,
        msg.reply_to.as_deref(),
        compose_summary(&created, &unresolved),
    );

    Ok(PipelineOutcome::Summary {
        extracted: candidates.len(),
        created,
        unresolved,
    })
}

/// Resolve each candidate against the catalog and persist the matches
///
/// Returns the matched catalog names (reviews created) and the entity names
/// that resolved to nothing, in processing order.
///
/// # Errors
///
/// Returns error if a catalog query fails; persistence failures are
/// per-item and never abort the batch
pub fn resolve_and_persist(
    state: &ApiState,
    msg: &NormalizedMessage,
    candidates: &[ReviewCandidate],
) -> Result<(Vec<String>, Vec<String>)> {
    // Registered-user linkage is opportunistic: a lookup failure only
    // costs the link, never the review
    let linked_user = msg.contact.as_deref().and_then(|phone| {
        state.user_repo.find_by_phone(phone).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "registered-user lookup failed");
            None
        })
    });

    let mut created = Vec::new();
    let mut unresolved = Vec::new();

    for candidate in candidates {
        let Some(masjid) = state
            .masjid_repo
            .find_match(&candidate.name, candidate.city.as_deref())?
        else {
            tracing::info!(name = %candidate.name, "no catalog match");
            unresolved.push(candidate.name.clone());
            continue;
        };

        let review = NewReview {
            masjid_id: &masjid.id,
            reviewer_name: &msg.display_name,
            rating: candidate.rating,
            text: &candidate.review,
            sender_phone: msg.contact.as_deref(),
            user_id: linked_user.as_ref().map(|u| u.id.as_str()),
        };

        // One bad row must not sink the rest of the batch
        match state.review_repo.insert_pending(&review) {
            Ok(_) => {
                tracing::info!(masjid = %masjid.name, "pending review created");
                created.push(masjid.name);
            }
            Err(e) => {
                tracing::error!(masjid = %masjid.name, error = %e, "failed to persist review");
            }
        }
    }

    Ok((created, unresolved))
}

/// Fire-and-forget reply dispatch
///
/// The HTTP response never waits on delivery; failures are logged and
/// dropped because the reviews are already durably saved.
fn dispatch_reply(state: &ApiState, to: Option<&str>, text: String) {
    let Some(to) = to else {
        tracing::debug!("no reply target, skipping reply");
        return;
    };
    let Some(channel) = state.whatsapp.clone() else {
        tracing::debug!("no reply channel configured, skipping reply");
        return;
    };

    let to = to.to_string();
    tokio::spawn(async move {
        if let Err(e) = channel.send_text(&to, &text).await {
            tracing::warn!(to, error = %e, "reply delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiState;
    use crate::config::IngestConfig;
    use crate::db::{self, MasjidRepo, MasjidStatus, ReviewRepo, UserRepo, WebhookLogRepo};

    fn test_state() -> ApiState {
        let db = db::init_memory().unwrap();
        ApiState {
            masjid_repo: MasjidRepo::new(db.clone()),
            review_repo: ReviewRepo::new(db.clone()),
            user_repo: UserRepo::new(db.clone()),
            webhook_logs: WebhookLogRepo::new(db.clone()),
            db,
            extractor: None,
            whatsapp: None,
            ingest: IngestConfig {
                device_id: Some("test-device".to_string()),
                group_trigger: "/review".to_string(),
                group_suffix: "@g.us".to_string(),
                direct_suffix: "@s.whatsapp.net".to_string(),
                fallback_name: "Hamba Allah".to_string(),
            },
        }
    }

    fn direct_message(contact: &str) -> NormalizedMessage {
        NormalizedMessage {
            reply_to: Some(format!("{contact}@s.whatsapp.net")),
            display_name: "Budi".to_string(),
            contact: Some(contact.to_string()),
            text: String::new(),
            is_group: false,
        }
    }

    #[test]
    fn test_matched_candidate_creates_pending_review() {
        let state = test_state();
        let masjid = state
            .masjid_repo
            .insert("Masjid Al Falah", Some("Surabaya"), None, MasjidStatus::Approved)
            .unwrap();

        // What the extraction service returns for
        // "Masjid Al-Falah bagus banget, rating 5/5"
        let raw = r#"[{"name": "Masjid Al-Falah", "city": null, "rating": 5, "review": "bagus banget"}]"#;
        let ParseOutcome::Items(candidates) = parse_candidates(raw) else {
            panic!("expected items");
        };

        let (created, unresolved) =
            resolve_and_persist(&state, &direct_message("628123456789"), &candidates).unwrap();

        assert_eq!(created, vec!["Masjid Al Falah".to_string()]);
        assert!(unresolved.is_empty());
        assert_eq!(state.review_repo.count_for_masjid(&masjid.id).unwrap(), 1);

        let pending = state.review_repo.list_pending().unwrap();
        assert_eq!(pending[0].reviewer_name, "Budi");
        assert_eq!(pending[0].rating, Some(5.0));
        assert_eq!(pending[0].sender_phone.as_deref(), Some("628123456789"));

        let summary = compose_summary(&created, &unresolved);
        assert!(summary.contains("Masjid Al Falah"));
    }

    #[test]
    fn test_unmatched_candidate_writes_nothing() {
        let state = test_state();

        let candidates = vec![ReviewCandidate {
            name: "Masjid Antah Berantah".to_string(),
            city: None,
            rating: None,
            review: "bagus".to_string(),
        }];

        let (created, unresolved) =
            resolve_and_persist(&state, &direct_message("628123456789"), &candidates).unwrap();

        assert!(created.is_empty());
        assert_eq!(unresolved, vec!["Masjid Antah Berantah".to_string()]);
        assert!(state.review_repo.list_pending().unwrap().is_empty());
    }

    #[test]
    fn test_mixed_batch_processes_independently() {
        let state = test_state();
        state
            .masjid_repo
            .insert("Masjid Istiqlal", Some("Jakarta"), None, MasjidStatus::Approved)
            .unwrap();

        let candidates = vec![
            ReviewCandidate {
                name: "Masjid Antah Berantah".to_string(),
                city: None,
                rating: None,
                review: "ramai".to_string(),
            },
            ReviewCandidate {
                name: "Istiqlal".to_string(),
                city: Some("Jakarta".to_string()),
                rating: Some(4.0),
                review: "megah".to_string(),
            },
        ];

        let (created, unresolved) =
            resolve_and_persist(&state, &direct_message("628123456789"), &candidates).unwrap();

        assert_eq!(created, vec!["Masjid Istiqlal".to_string()]);
        assert_eq!(unresolved, vec!["Masjid Antah Berantah".to_string()]);
    }

    #[test]
    fn test_known_sender_gets_linked() {
        let state = test_state();
        let user = state.user_repo.insert("628123456789", Some("Budi")).unwrap();
        state
            .masjid_repo
            .insert("Masjid An-Nur", None, None, MasjidStatus::Approved)
            .unwrap();

        let candidates = vec![ReviewCandidate {
            name: "An-Nur".to_string(),
            city: None,
            rating: None,
            review: "bersih".to_string(),
        }];

        resolve_and_persist(&state, &direct_message("628123456789"), &candidates).unwrap();

        let pending = state.review_repo.list_pending().unwrap();
        assert_eq!(pending[0].user_id.as_deref(), Some(user.id.as_str()));
    }

    #[test]
    fn test_unknown_sender_left_unlinked() {
        let state = test_state();
        state
            .masjid_repo
            .insert("Masjid An-Nur", None, None, MasjidStatus::Approved)
            .unwrap();

        let candidates = vec![ReviewCandidate {
            name: "An-Nur".to_string(),
            city: None,
            rating: None,
            review: "bersih".to_string(),
        }];

        resolve_and_persist(&state, &direct_message("620000000000"), &candidates).unwrap();

        let pending = state.review_repo.list_pending().unwrap();
        assert_eq!(pending[0].user_id, None);
        // Linkage is opportunistic: no user record gets created
        assert!(state.user_repo.find_by_phone("620000000000").unwrap().is_none());
    }
}
