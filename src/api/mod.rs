//! HTTP API server for the Minaret gateway

pub mod health;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::channels::WhatsAppChannel;
use crate::config::{Config, IngestConfig};
use crate::db::{DbPool, MasjidRepo, ReviewRepo, UserRepo, WebhookLogRepo};
use crate::extract::Extractor;
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub masjid_repo: MasjidRepo,
    pub review_repo: ReviewRepo,
    pub user_repo: UserRepo,
    pub webhook_logs: WebhookLogRepo,
    /// Review extractor. Present only when an API key is configured;
    /// without it every eligible message terminates as an extraction failure.
    pub extractor: Option<Extractor>,
    /// Outbound reply channel. Replies are silently skipped when absent.
    pub whatsapp: Option<WhatsAppChannel>,
    pub ingest: IngestConfig,
}

impl ApiState {
    /// Build API state from configuration and an initialized pool
    #[must_use]
    pub fn from_config(config: &Config, db: DbPool) -> Self {
        let extractor = config.extraction.api_key.clone().map(|key| {
            Extractor::new(
                config.extraction.api_url.clone(),
                key,
                config.extraction.model.clone(),
            )
        });
        if extractor.is_none() {
            tracing::warn!("no extraction API key configured, webhook extraction disabled");
        }

        let whatsapp = config
            .whatsapp
            .clone()
            .map(|c| WhatsAppChannel::new(c.api_url, c.token));
        if whatsapp.is_none() {
            tracing::warn!("no WhatsApp gateway configured, replies disabled");
        }

        Self {
            masjid_repo: MasjidRepo::new(db.clone()),
            review_repo: ReviewRepo::new(db.clone()),
            user_repo: UserRepo::new(db.clone()),
            webhook_logs: WebhookLogRepo::new(db.clone()),
            db,
            extractor,
            whatsapp,
            ingest: config.ingest.clone(),
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create the API server
    ///
    /// # Errors
    ///
    /// Returns error if no device identifier is configured; the webhook
    /// endpoint cannot authenticate calls without one
    pub fn new(config: &Config, db: DbPool, port: u16) -> Result<Self> {
        if config.ingest.device_id.is_none() {
            return Err(Error::Config(
                "ingest device id is required (set MINARET_DEVICE_ID)".to_string(),
            ));
        }

        let state = Arc::new(ApiState::from_config(config, db));
        Ok(Self { state, port })
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let router = Router::new()
            .nest("/webhook", webhooks::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // CORS layer for cross-origin dashboard calls
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
