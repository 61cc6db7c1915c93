//! Registered-user lookups
//!
//! Accounts are created by the registration subsystem. The pipeline only
//! reads them to opportunistically link a review to a known sender.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A registered user
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub id: String,
    pub phone: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a user by normalized phone number (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_phone(&self, phone: &str) -> Result<Option<RegisteredUser>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let user = conn
            .query_row(
                "SELECT id, phone, name, created_at FROM users WHERE phone = ?1",
                [phone],
                |row| {
                    Ok(RegisteredUser {
                        id: row.get(0)?,
                        phone: row.get(1)?,
                        name: row.get(2)?,
                        created_at: parse_datetime(&row.get::<_, String>(3)?),
                    })
                },
            )
            .ok();

        Ok(user)
    }

    /// Insert a user (registration-side operation, used by tests and tooling)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, phone: &str, name: Option<&str>) -> Result<RegisteredUser> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (id, phone, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, phone, name, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(RegisteredUser {
            id,
            phone: phone.to_string(),
            name: name.map(ToString::to_string),
            created_at: Utc::now(),
        })
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> UserRepo {
        let pool = init_memory().unwrap();
        UserRepo::new(pool)
    }

    #[test]
    fn test_find_by_phone() {
        let repo = setup();
        repo.insert("628123456789", Some("Budi")).unwrap();

        let user = repo.find_by_phone("628123456789").unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Budi"));

        assert!(repo.find_by_phone("620000000000").unwrap().is_none());
    }
}
