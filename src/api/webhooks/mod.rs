//! Webhook endpoints for channel integrations

use std::sync::Arc;

use axum::{Router, routing::post};

use super::ApiState;

pub mod ingest;

/// Build webhooks router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/ingest",
            post(ingest::handle_ingest).get(ingest::handle_probe),
        )
        .with_state(state)
}
