//! Review repository
//!
//! Reviews created by this pipeline are always moderation-pending; the
//! moderation workflow that approves or rejects them lives elsewhere.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Provenance tag for reviews created by the WhatsApp ingestion channel
pub const SOURCE_WHATSAPP: &str = "whatsapp";

/// A stored review
#[derive(Debug, Clone)]
pub struct Review {
    pub id: String,
    pub masjid_id: String,
    pub reviewer_name: String,
    pub rating: Option<f64>,
    pub text: String,
    pub source: String,
    pub status: String,
    pub sender_phone: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a review about to be persisted
#[derive(Debug)]
pub struct NewReview<'a> {
    pub masjid_id: &'a str,
    pub reviewer_name: &'a str,
    /// Raw rating as extracted; not normalized to any scale at ingest
    pub rating: Option<f64>,
    pub text: &'a str,
    pub sender_phone: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

/// Review repository
#[derive(Clone)]
pub struct ReviewRepo {
    pool: DbPool,
}

impl ReviewRepo {
    /// Create a new review repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a pending review from the ingestion channel
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert_pending(&self, review: &NewReview<'_>) -> Result<Review> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO reviews
                 (id, masjid_id, reviewer_name, rating, text, source, status,
                  sender_phone, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8, ?9)",
            rusqlite::params![
                id,
                review.masjid_id,
                review.reviewer_name,
                review.rating,
                review.text,
                SOURCE_WHATSAPP,
                review.sender_phone,
                review.user_id,
                now
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Review {
            id,
            masjid_id: review.masjid_id.to_string(),
            reviewer_name: review.reviewer_name.to_string(),
            rating: review.rating,
            text: review.text.to_string(),
            source: SOURCE_WHATSAPP.to_string(),
            status: "pending".to_string(),
            sender_phone: review.sender_phone.map(ToString::to_string),
            user_id: review.user_id.map(ToString::to_string),
            created_at: Utc::now(),
        })
    }

    /// List reviews awaiting moderation, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_pending(&self) -> Result<Vec<Review>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, masjid_id, reviewer_name, rating, text, source, status,
                        sender_phone, user_id, created_at
                 FROM reviews WHERE status = 'pending' ORDER BY created_at DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let reviews = stmt
            .query_map([], row_to_review)
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(reviews)
    }

    /// Count reviews referencing a catalog entry (any status)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count_for_masjid(&self, masjid_id: &str) -> Result<i64> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM reviews WHERE masjid_id = ?1",
                [masjid_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(count)
    }
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        masjid_id: row.get(1)?,
        reviewer_name: row.get(2)?,
        rating: row.get(3)?,
        text: row.get(4)?,
        source: row.get(5)?,
        status: row.get(6)?,
        sender_phone: row.get(7)?,
        user_id: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
