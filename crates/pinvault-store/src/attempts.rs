//! Attempt ledger over the `login_attempts` table.
//!
//! One row per failed PIN verification, keyed by client address. The
//! authenticator counts rows inside a trailing window to rate-limit logins
//! and clears an address's rows after a successful login.
//!
//! Timestamps are unix seconds supplied by the caller so the window logic can
//! be exercised without sleeping.

use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// Append / count / clear failed login attempts.
#[derive(Debug, Clone)]
pub struct AttemptLedger {
    db: Database,
}

impl AttemptLedger {
    /// Create a new ledger backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a failed attempt from `ip_address` at `timestamp`.
    ///
    /// Rows from any address older than `expire_before` are deleted in the
    /// same call. They can no longer fall inside a window starting at or
    /// after `expire_before`, so counts are unaffected.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        ip_address: &str,
        timestamp: i64,
        expire_before: i64,
    ) -> StoreResult<()> {
        let ip = ip_address.to_string();
        self.db
            .execute(move |conn| {
                let expired = conn.execute(
                    "DELETE FROM login_attempts WHERE attempt_timestamp < ?1",
                    rusqlite::params![expire_before],
                )?;
                if expired > 0 {
                    debug!(expired, "expired login attempts pruned");
                }
                conn.execute(
                    "INSERT INTO login_attempts (ip_address, attempt_timestamp) VALUES (?1, ?2)",
                    rusqlite::params![ip, timestamp],
                )?;
                Ok(())
            })
            .await
    }

    /// Count attempts from `ip_address` with timestamp `>= since`.
    #[instrument(skip(self))]
    pub async fn count_since(&self, ip_address: &str, since: i64) -> StoreResult<u32> {
        let ip = ip_address.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM login_attempts \
                     WHERE ip_address = ?1 AND attempt_timestamp >= ?2",
                    rusqlite::params![ip, since],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Delete every attempt from `ip_address`, returning how many were removed.
    #[instrument(skip(self))]
    pub async fn clear(&self, ip_address: &str) -> StoreResult<usize> {
        let ip = ip_address.to_string();
        self.db
            .execute(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM login_attempts WHERE ip_address = ?1",
                    rusqlite::params![ip],
                )?;
                debug!(removed, "login attempts cleared");
                Ok(removed)
            })
            .await
    }
}
