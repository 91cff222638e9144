//! Config store over the `vault_config` key-value table.
//!
//! The only key used in normal operation is [`MASTER_PIN_HASH_KEY`], written
//! once by the setup command and read on every login.

use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// Key under which the master PIN hash is stored.
pub const MASTER_PIN_HASH_KEY: &str = "master_pin_hash";

/// Persistent key-value store for vault configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    db: Database,
}

impl ConfigStore {
    /// Create a new config store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a value by key, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT config_value FROM vault_config WHERE config_key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Insert `value` under `key` only if the key is absent or holds an
    /// empty value.
    ///
    /// Returns `true` if the row was written.
    #[instrument(skip(self, value))]
    pub async fn insert_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .execute(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO vault_config (config_key, config_value) VALUES (?1, ?2) \
                     ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value \
                     WHERE vault_config.config_value = ''",
                    rusqlite::params![key, value],
                )?;
                Ok(inserted > 0)
            })
            .await
    }

    /// Set a value for a key (insert or replace).
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO vault_config (config_key, config_value) VALUES (?1, ?2) \
                     ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
                    rusqlite::params![key, value],
                )?;
                debug!(key = %key, "vault config updated");
                Ok(())
            })
            .await
    }

    /// The stored master PIN hash, treating an empty value as absent.
    pub async fn pin_hash(&self) -> StoreResult<Option<String>> {
        Ok(self
            .get(MASTER_PIN_HASH_KEY)
            .await?
            .filter(|hash| !hash.is_empty()))
    }
}
