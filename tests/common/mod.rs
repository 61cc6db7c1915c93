//! Shared test utilities

use minaret_gateway::config::IngestConfig;
use minaret_gateway::{DbPool, db};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Ingest rules used across webhook tests
#[must_use]
pub fn test_ingest_config() -> IngestConfig {
    IngestConfig {
        device_id: Some("test-device".to_string()),
        group_trigger: "/review".to_string(),
        group_suffix: "@g.us".to_string(),
        direct_suffix: "@s.whatsapp.net".to_string(),
        fallback_name: "Hamba Allah".to_string(),
    }
}
