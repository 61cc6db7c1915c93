//! WhatsApp ingestion webhook
//!
//! One call per inbound message. The raw body is logged before anything
//! else so even malformed requests stay inspectable, and every outcome
//! short of structurally invalid input answers 200 — the device gateway
//! retries anything else, and a retried message would double-process.

pub mod normalize;
mod process;

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use self::normalize::{Normalized, Rejection};
use self::process::PipelineOutcome;
use crate::api::ApiState;

/// Inbound webhook payload
///
/// Decoded tolerantly; field validation is the normalizer's job.
#[derive(Debug, Default, Deserialize)]
pub struct IngestPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    /// Sender JID; a group-suffix marker indicates a group context
    #[serde(default)]
    pub sender: Option<String>,
    /// Sender display name, when the gateway forwards one
    #[serde(default)]
    pub name: Option<String>,
    /// Group-member JID for group messages
    #[serde(default)]
    pub member: Option<String>,
}

/// Webhook response body; `ok` is always present
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<usize>,
}

impl IngestResponse {
    const fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
            error: None,
            detail: None,
            extracted: None,
            created: None,
            unresolved: None,
        }
    }

    fn ignored(reason: &'static str) -> Self {
        Self {
            reason: Some(reason),
            ..Self::ok()
        }
    }

    fn failed(error: &'static str) -> Self {
        Self {
            ok: false,
            error: Some(error),
            ..Self::ok()
        }
    }

    fn failed_with_detail(error: &'static str, detail: String) -> Self {
        Self {
            detail: Some(detail),
            ..Self::failed(error)
        }
    }
}

/// Health probe for the webhook origin (`GET /webhook/ingest`)
pub async fn handle_probe() -> Json<IngestResponse> {
    Json(IngestResponse::ok())
}

/// Handle an inbound message (`POST /webhook/ingest`)
pub async fn handle_ingest(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> (StatusCode, Json<IngestResponse>) {
    // Capture the verbatim body before any validation
    let log_id = state.webhook_logs.open(&body);
    let mut stages = Map::new();

    let payload: IngestPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body is not valid JSON");
            return finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "invalid_json",
                StatusCode::BAD_REQUEST,
                IngestResponse::failed("invalid_json"),
            );
        }
    };

    let msg = match normalize::normalize(&payload, &state.ingest) {
        Normalized::Rejected(Rejection::MissingMessage) => {
            tracing::warn!("webhook payload missing message text");
            return finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "missing_message",
                StatusCode::BAD_REQUEST,
                IngestResponse::failed("missing_message"),
            );
        }
        Normalized::Rejected(Rejection::InvalidDevice) => {
            tracing::warn!(device = ?payload.device, "webhook device mismatch");
            return finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "invalid_device",
                StatusCode::BAD_REQUEST,
                IngestResponse::failed("invalid_device"),
            );
        }
        Normalized::Rejected(Rejection::NoTrigger) => {
            // Untriggered group chatter: acknowledge and move on
            return finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "no_trigger",
                StatusCode::OK,
                IngestResponse::ignored("no_trigger"),
            );
        }
        Normalized::Rejected(Rejection::EmptyAfterStrip) => {
            return finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "empty_after_strip",
                StatusCode::OK,
                IngestResponse::ignored("empty_after_strip"),
            );
        }
        Normalized::Eligible(msg) => msg,
    };

    stages.insert(
        "normalized".to_string(),
        json!({
            "text": msg.text,
            "display_name": msg.display_name,
            "is_group": msg.is_group,
        }),
    );
    state
        .webhook_logs
        .record(log_id.as_deref(), &Value::Object(stages.clone()));

    match process::run(&state, &msg, log_id.as_deref(), &mut stages).await {
        Ok(PipelineOutcome::ExtractionFailed(detail)) => finish(
            &state,
            log_id.as_deref(),
            &mut stages,
            "extraction_failed",
            StatusCode::OK,
            IngestResponse::failed_with_detail("extraction_failed", detail),
        ),
        Ok(PipelineOutcome::NotParseable) => finish(
            &state,
            log_id.as_deref(),
            &mut stages,
            "not_parseable",
            StatusCode::OK,
            IngestResponse::failed("not_parseable"),
        ),
        Ok(PipelineOutcome::NotArray) => finish(
            &state,
            log_id.as_deref(),
            &mut stages,
            "not_array",
            StatusCode::OK,
            IngestResponse::failed("not_array"),
        ),
        Ok(PipelineOutcome::Summary {
            extracted,
            created,
            unresolved,
        }) => {
            let response = IngestResponse {
                extracted: Some(extracted),
                created: Some(created.len()),
                unresolved: Some(unresolved.len()),
                ..IngestResponse::ok()
            };
            finish(&state, log_id.as_deref(), &mut stages, "processed", StatusCode::OK, response)
        }
        Err(e) => {
            // The gateway retries non-2xx deliveries, and a retry of a
            // partially-persisted batch would duplicate reviews
            tracing::error!(error = %e, "ingestion pipeline failed");
            finish(
                &state,
                log_id.as_deref(),
                &mut stages,
                "pipeline_error",
                StatusCode::OK,
                IngestResponse::failed_with_detail("pipeline_error", e.to_string()),
            )
        }
    }
}

/// Record the final outcome snapshot and build the HTTP reply
fn finish(
    state: &ApiState,
    log_id: Option<&str>,
    stages: &mut Map<String, Value>,
    outcome: &str,
    status: StatusCode,
    response: IngestResponse,
) -> (StatusCode, Json<IngestResponse>) {
    stages.insert("outcome".to_string(), json!(outcome));
    state
        .webhook_logs
        .record(log_id, &Value::Object(stages.clone()));
    (status, Json(response))
}
