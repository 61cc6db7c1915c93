//! Mosque catalog repository and fuzzy name matching
//!
//! The catalog is owned by the directory-management subsystem; this pipeline
//! only reads it to resolve free-text mosque mentions against approved
//! entries, and writes through the CLI for operator seeding.

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Generic qualifiers that appear in almost every entry name. They carry no
/// distinguishing power, so they are dropped before substring matching.
const STOP_WORDS: &[&str] = &[
    "masjid", "mesjid", "mosque", "musholla", "mushola", "musala", "surau",
    "langgar", "al", "agung", "raya", "besar", "jami",
];

/// Approval status of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasjidStatus {
    /// Awaiting directory moderation
    Pending,
    /// Visible and matchable
    Approved,
    /// Rejected by moderation
    Rejected,
}

impl MasjidStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone)]
pub struct Masjid {
    pub id: String,
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub status: MasjidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Split a free-text mosque name into matchable tokens
///
/// Splits on whitespace and hyphens, lowercases, then drops single-character
/// tokens and stop words. An empty result means the name was entirely
/// generic and cannot be matched.
#[must_use]
pub fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| c.is_whitespace() || c == '-')
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Mosque catalog repository
#[derive(Clone)]
pub struct MasjidRepo {
    pool: DbPool,
}

impl MasjidRepo {
    /// Create a new catalog repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a catalog entry
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(
        &self,
        name: &str,
        city: Option<&str>,
        address: Option<&str>,
        status: MasjidStatus,
    ) -> Result<Masjid> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO masjids (id, name, city, address, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![id, name, city, address, status.as_str(), now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Masjid {
            id,
            name: name.to_string(),
            city: city.map(ToString::to_string),
            address: address.map(ToString::to_string),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    /// Find an entry by ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<Masjid>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let masjid = conn
            .query_row(
                "SELECT id, name, city, address, status, created_at, updated_at
                 FROM masjids WHERE id = ?1",
                [id],
                row_to_masjid,
            )
            .ok();

        Ok(masjid)
    }

    /// Update an entry's approval status
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the entry does not exist, or error if the
    /// database operation fails
    pub fn set_status(&self, id: &str, status: MasjidStatus) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE masjids SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), now, id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("masjid {id}")));
        }

        Ok(())
    }

    /// Resolve a free-text mosque mention to at most one approved entry
    ///
    /// An entry qualifies when its name contains ANY surviving token as a
    /// substring (deliberately permissive OR semantics). With a locality
    /// hint the locality-restricted query runs first; when it yields
    /// nothing the query reruns without the restriction, because senders'
    /// locality spelling is inconsistent with the catalog. Rows are ordered
    /// by name so "first hit wins" is deterministic.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_match(&self, name: &str, city: Option<&str>) -> Result<Option<Masjid>> {
        let tokens = name_tokens(name);
        if tokens.is_empty() {
            tracing::debug!(name, "no distinguishing tokens, skipping match");
            return Ok(None);
        }

        if let Some(city) = city {
            if let Some(hit) = self.query_match(&tokens, Some(city))? {
                return Ok(Some(hit));
            }
        }

        self.query_match(&tokens, None)
    }

    fn query_match(&self, tokens: &[String], city: Option<&str>) -> Result<Option<Masjid>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let name_clause = tokens
            .iter()
            .map(|_| "name LIKE ?")
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut sql = format!(
            "SELECT id, name, city, address, status, created_at, updated_at
             FROM masjids WHERE status = 'approved' AND ({name_clause})"
        );
        if city.is_some() {
            sql.push_str(" AND city LIKE ?");
        }
        sql.push_str(" ORDER BY name LIMIT 1");

        let mut patterns: Vec<String> = tokens.iter().map(|t| format!("%{t}%")).collect();
        if let Some(city) = city {
            patterns.push(format!("%{city}%"));
        }

        let masjid = conn
            .query_row(&sql, params_from_iter(patterns.iter()), row_to_masjid)
            .ok();

        Ok(masjid)
    }
}

fn row_to_masjid(row: &rusqlite::Row<'_>) -> rusqlite::Result<Masjid> {
    Ok(Masjid {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        address: row.get(3)?,
        status: MasjidStatus::from_str(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> MasjidRepo {
        let pool = init_memory().unwrap();
        MasjidRepo::new(pool)
    }

    #[test]
    fn test_name_tokens_drop_generics() {
        assert_eq!(name_tokens("Masjid Al-Falah"), vec!["falah"]);
        assert_eq!(name_tokens("Mesjid Agung Raya"), Vec::<String>::new());
        assert_eq!(
            name_tokens("Masjid Istiqlal Jakarta"),
            vec!["istiqlal", "jakarta"]
        );
    }

    #[test]
    fn test_name_tokens_drop_short() {
        // Single-character fragments from hyphen splits are noise
        assert_eq!(name_tokens("Masjid A-Rahman"), vec!["rahman"]);
    }

    #[test]
    fn test_match_by_distinctive_token() {
        let repo = setup();
        repo.insert("Masjid Al Falah", Some("Surabaya"), None, MasjidStatus::Approved)
            .unwrap();

        let hit = repo.find_match("Masjid Al-Falah", None).unwrap();
        assert_eq!(hit.unwrap().name, "Masjid Al Falah");
    }

    #[test]
    fn test_generic_only_name_matches_nothing() {
        let repo = setup();
        repo.insert("Masjid Agung", Some("Semarang"), None, MasjidStatus::Approved)
            .unwrap();

        assert!(repo.find_match("masjid agung", None).unwrap().is_none());
    }

    #[test]
    fn test_unapproved_entries_excluded() {
        let repo = setup();
        repo.insert("Masjid An-Nur", None, None, MasjidStatus::Pending)
            .unwrap();

        assert!(repo.find_match("An-Nur", None).unwrap().is_none());
    }

    #[test]
    fn test_locality_narrows_match() {
        let repo = setup();
        repo.insert("Masjid Raya Baiturrahman", Some("Banda Aceh"), None, MasjidStatus::Approved)
            .unwrap();
        repo.insert("Masjid Baiturrahman", Some("Semarang"), None, MasjidStatus::Approved)
            .unwrap();

        let hit = repo
            .find_match("baiturrahman", Some("Semarang"))
            .unwrap()
            .unwrap();
        assert_eq!(hit.city.as_deref(), Some("Semarang"));
    }

    #[test]
    fn test_locality_miss_falls_back_to_global() {
        let repo = setup();
        repo.insert("Masjid Istiqlal", Some("Jakarta"), None, MasjidStatus::Approved)
            .unwrap();

        // Sender's locality is wrong but the name is unambiguous
        let hit = repo.find_match("Istiqlal", Some("Bogor")).unwrap();
        assert_eq!(hit.unwrap().name, "Masjid Istiqlal");
    }

    #[test]
    fn test_set_status() {
        let repo = setup();
        let m = repo
            .insert("Masjid An-Nur", None, None, MasjidStatus::Pending)
            .unwrap();

        repo.set_status(&m.id, MasjidStatus::Approved).unwrap();
        assert!(repo.find_match("An-Nur", None).unwrap().is_some());

        assert!(matches!(
            repo.set_status("missing", MasjidStatus::Approved),
            Err(Error::NotFound(_))
        ));
    }
}
