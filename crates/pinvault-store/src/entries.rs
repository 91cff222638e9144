//! Credential store over the `password_entries` table.
//!
//! Rows hold the website, the username and the password sealed by the
//! vault cipher (ciphertext and IV, both base64 text). This store never sees
//! plaintext passwords. Entries are inserted and deleted, never updated.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// A stored vault entry with its password still encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: i64,
    pub website: String,
    pub username: String,
    /// Base64 ciphertext (including the AEAD tag).
    pub ciphertext: String,
    /// Base64 initialization vector used for this row only.
    pub iv: String,
    /// Unix timestamp of insertion.
    pub created_at: i64,
}

/// Fields of an entry about to be inserted.
#[derive(Debug, Clone)]
pub struct NewEntryRow {
    pub website: String,
    pub username: String,
    pub ciphertext: String,
    pub iv: String,
}

/// Insert / list / delete over `password_entries`.
#[derive(Debug, Clone)]
pub struct EntryStore {
    db: Database,
}

impl EntryStore {
    /// Create a new entry store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a row and return its id.
    #[instrument(skip(self, entry), fields(website = %entry.website))]
    pub async fn insert(&self, entry: NewEntryRow) -> StoreResult<i64> {
        let now = Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO password_entries \
                     (website_name, username, encrypted_password, iv, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        entry.website,
                        entry.username,
                        entry.ciphertext,
                        entry.iv,
                        now
                    ],
                )?;
                let id = conn.last_insert_rowid();
                debug!(entry_id = id, "password entry inserted");
                Ok(id)
            })
            .await
    }

    /// All rows ordered by website name ascending (ties by id).
    #[instrument(skip(self))]
    pub async fn list(&self) -> StoreResult<Vec<EntryRow>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, website_name, username, encrypted_password, iv, created_at \
                     FROM password_entries ORDER BY website_name ASC, id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(EntryRow {
                            id: row.get(0)?,
                            website: row.get(1)?,
                            username: row.get(2)?,
                            ciphertext: row.get(3)?,
                            iv: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Delete a row by id, returning `true` if a row was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM password_entries WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Number of stored entries.
    pub async fn count(&self) -> StoreResult<i64> {
        self.db
            .execute(|conn| {
                Ok(conn.query_row("SELECT count(*) FROM password_entries", [], |row| {
                    row.get(0)
                })?)
            })
            .await
    }
}
