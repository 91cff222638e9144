//! The vault API: session-gated CRUD over encrypted password entries.
//!
//! [`Vault`] sits on top of the [`EntryStore`] and a [`Cipher`]. Passwords
//! are encrypted before they reach SQLite and decrypted on the way out.
//! Every operation checks the caller's session first, so an unauthenticated
//! caller never reaches storage.
//!
//! # Example
//!
//! ```rust,no_run
//! # use pinvault_vault::{Cipher, NewEntry, Vault};
//! # use pinvault_store::{Database, Session};
//! # async fn example(session: Session) -> pinvault_vault::Result<()> {
//! let db = Database::open_and_migrate("data/pinvault.db").await?;
//! let cipher = Cipher::from_base64_key("...base64 key...")?;
//! let vault = Vault::new(db, cipher);
//!
//! vault
//!     .create_entry(
//!         Some(&session),
//!         NewEntry::new("example.com", "bob", "secret1"),
//!     )
//!     .await?;
//!
//! for entry in vault.list_entries(Some(&session)).await? {
//!     println!("{} / {}", entry.website, entry.username);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use pinvault_store::{Database, EntryStore, NewEntryRow, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::auth::require_authenticated;
use crate::crypto::Cipher;
use crate::error::{Result, VaultError};

/// Marker returned in place of a password that could not be decrypted.
pub const DECRYPTION_FAILED: &str = "decryption_failed";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A vault entry as returned to an authenticated caller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: i64,
    pub website: String,
    pub username: String,
    /// The decrypted password, or `None` if this row failed to decrypt.
    pub password: Option<String>,
    /// Per-row error marker, set together with `password: None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl std::fmt::Debug for EntryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryView")
            .field("id", &self.id)
            .field("website", &self.website)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("error", &self.error)
            .finish()
    }
}

/// A new entry submitted by the caller.
#[derive(Clone, Default, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl NewEntry {
    pub fn new(
        website: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            website: website.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for NewEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewEntry")
            .field("website", &self.website)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Session-gated, encrypting front end to the password entry table.
#[derive(Debug, Clone)]
pub struct Vault {
    entries: EntryStore,
    cipher: Arc<Cipher>,
}

impl Vault {
    /// Create a vault over `db` sealing passwords with `cipher`.
    pub fn new(db: Database, cipher: Cipher) -> Self {
        Self {
            entries: EntryStore::new(db),
            cipher: Arc::new(cipher),
        }
    }

    /// All entries ordered by website, passwords decrypted.
    ///
    /// A row that fails to decrypt is still listed, with `password: None`
    /// and the [`DECRYPTION_FAILED`] marker.
    #[instrument(skip_all)]
    pub async fn list_entries(&self, session: Option<&Session>) -> Result<Vec<EntryView>> {
        require_authenticated(session)?;

        let rows = self.entries.list().await?;
        let views = rows
            .into_iter()
            .map(|row| match self.cipher.decrypt(&row.ciphertext, &row.iv) {
                Ok(password) => EntryView {
                    id: row.id,
                    website: row.website,
                    username: row.username,
                    password: Some(password),
                    error: None,
                },
                Err(e) => {
                    warn!(entry_id = row.id, error = %e, "failed to decrypt entry");
                    EntryView {
                        id: row.id,
                        website: row.website,
                        username: row.username,
                        password: None,
                        error: Some(DECRYPTION_FAILED.to_owned()),
                    }
                }
            })
            .collect::<Vec<_>>();

        debug!(count = views.len(), "listed entries");
        Ok(views)
    }

    /// Encrypt and store a new entry, echoing it back with its id.
    #[instrument(skip_all)]
    pub async fn create_entry(&self, session: Option<&Session>, entry: NewEntry) -> Result<EntryView> {
        require_authenticated(session)?;

        let website = entry.website.trim().to_owned();
        let username = entry.username.trim().to_owned();
        if website.is_empty() || username.is_empty() || entry.password.is_empty() {
            return Err(VaultError::InvalidInput("Missing required fields".into()));
        }

        let sealed = self.cipher.encrypt(&entry.password)?;
        let id = self
            .entries
            .insert(NewEntryRow {
                website: website.clone(),
                username: username.clone(),
                ciphertext: sealed.ciphertext,
                iv: sealed.iv,
            })
            .await?;

        debug!(entry_id = id, "entry created");
        Ok(EntryView {
            id,
            website,
            username,
            password: Some(entry.password),
            error: None,
        })
    }

    /// Delete an entry by id.
    #[instrument(skip(self, session))]
    pub async fn delete_entry(&self, session: Option<&Session>, id: i64) -> Result<()> {
        require_authenticated(session)?;

        if id <= 0 {
            return Err(VaultError::InvalidInput(
                "Invalid or missing ID for deletion".into(),
            ));
        }

        if self.entries.delete(id).await? {
            debug!(entry_id = id, "entry deleted");
            Ok(())
        } else {
            Err(VaultError::NotFound { id })
        }
    }
}
