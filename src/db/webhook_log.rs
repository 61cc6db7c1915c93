//! Durable webhook request log
//!
//! Every inbound call is captured verbatim before any validation, then
//! annotated with a progressively-updated result snapshot as the pipeline
//! advances. Both operations are best-effort: a logging failure must never
//! block the request path, so errors are warned about and swallowed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A logged webhook request
#[derive(Debug, Clone)]
pub struct WebhookLog {
    pub id: String,
    pub body: String,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Webhook log repository
#[derive(Clone)]
pub struct WebhookLogRepo {
    pool: DbPool,
}

impl WebhookLogRepo {
    /// Create a new webhook log repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record the raw request body under a fresh ID
    ///
    /// Returns `None` when the insert fails; subsequent `record` calls with
    /// a `None` id are no-ops, keeping the request path alive.
    #[must_use]
    pub fn open(&self, raw_body: &str) -> Option<String> {
        match self.try_open(raw_body) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open webhook log");
                None
            }
        }
    }

    fn try_open(&self, raw_body: &str) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO webhook_logs (id, body, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, raw_body, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(id)
    }

    /// Overwrite the stored result with the latest snapshot (last write wins)
    pub fn record(&self, log_id: Option<&str>, snapshot: &serde_json::Value) {
        let Some(id) = log_id else {
            return;
        };

        if let Err(e) = self.try_record(id, snapshot) {
            tracing::warn!(log_id = id, error = %e, "failed to record webhook result");
        }
    }

    fn try_record(&self, id: &str, snapshot: &serde_json::Value) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "UPDATE webhook_logs SET result = ?1 WHERE id = ?2",
            rusqlite::params![snapshot.to_string(), id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// Fetch a logged request by ID (inspection and tests)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<WebhookLog>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let log = conn
            .query_row(
                "SELECT id, body, result, created_at FROM webhook_logs WHERE id = ?1",
                [id],
                |row| {
                    Ok(WebhookLog {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        result: row
                            .get::<_, Option<String>>(2)?
                            .and_then(|s| serde_json::from_str(&s).ok()),
                        created_at: parse_datetime(&row.get::<_, String>(3)?),
                    })
                },
            )
            .ok();

        Ok(log)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> WebhookLogRepo {
        let pool = init_memory().unwrap();
        WebhookLogRepo::new(pool)
    }

    #[test]
    fn test_open_captures_raw_body() {
        let repo = setup();
        let id = repo.open("this is not even json {").unwrap();

        let log = repo.find(&id).unwrap().unwrap();
        assert_eq!(log.body, "this is not even json {");
        assert!(log.result.is_none());
    }

    #[test]
    fn test_record_last_write_wins() {
        let repo = setup();
        let id = repo.open("{}").unwrap();

        repo.record(Some(&id), &serde_json::json!({"stage": "normalized"}));
        repo.record(Some(&id), &serde_json::json!({"stage": "done", "created": 2}));

        let log = repo.find(&id).unwrap().unwrap();
        assert_eq!(log.result.unwrap()["stage"], "done");
    }

    #[test]
    fn test_record_without_id_is_noop() {
        let repo = setup();
        // Must not panic or error when open failed upstream
        repo.record(None, &serde_json::json!({"stage": "done"}));
    }
}
