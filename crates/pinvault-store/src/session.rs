//! Server-side session records backed by [`moka`].
//!
//! The browser only holds an opaque session id in a cookie; the record it
//! points at lives here. Records expire after an idle period and after an
//! absolute lifetime, whichever comes first, and can be removed explicitly
//! on logout or when a login regenerates the id.
//!
//! Session ids are generated by the caller (the vault crate owns the
//! CSPRNG); this store only keeps and expires them.

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A server-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, unguessable identifier carried by the session cookie.
    pub id: String,
    /// Whether the holder has proven knowledge of the master PIN.
    pub authenticated: bool,
    /// Unix timestamp when the session was created.
    pub created_at: i64,
}

impl Session {
    /// A freshly authenticated session with the given id.
    pub fn authenticated(id: String) -> Self {
        Self {
            id,
            authenticated: true,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// In-memory session record store with idle and absolute expiry.
#[derive(Clone)]
pub struct SessionStore {
    inner: Cache<String, Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl SessionStore {
    /// Start building a session store.
    pub fn builder() -> SessionStoreBuilder {
        SessionStoreBuilder {
            max_sessions: 1_000,
            idle_timeout: Duration::from_secs(30 * 60),
            max_lifetime: Duration::from_secs(12 * 60 * 60),
        }
    }

    /// Look up a live session. Returns `None` for unknown or expired ids.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.inner.get(id).await
    }

    /// Store a session record under its id.
    pub async fn insert(&self, session: Session) {
        debug!(authenticated = session.authenticated, "session stored");
        self.inner.insert(session.id.clone(), session).await;
    }

    /// Remove a session record. Unknown ids are ignored.
    pub async fn remove(&self, id: &str) {
        if self.inner.remove(id).await.is_some() {
            debug!("session removed");
        }
    }

    /// Approximate number of live sessions.
    pub fn live_sessions(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Builder for [`SessionStore`].
#[derive(Debug)]
pub struct SessionStoreBuilder {
    max_sessions: u64,
    idle_timeout: Duration,
    max_lifetime: Duration,
}

impl SessionStoreBuilder {
    /// Maximum number of concurrent session records.
    pub fn max_sessions(mut self, max: u64) -> Self {
        self.max_sessions = max;
        self
    }

    /// A session unused for this long expires.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// A session expires this long after creation regardless of use.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Build the session store.
    pub fn build(self) -> SessionStore {
        let inner = Cache::builder()
            .max_capacity(self.max_sessions)
            .time_to_idle(self.idle_timeout)
            .time_to_live(self.max_lifetime)
            .build();

        debug!(
            max_sessions = self.max_sessions,
            idle_secs = self.idle_timeout.as_secs(),
            lifetime_secs = self.max_lifetime.as_secs(),
            "session store created"
        );

        SessionStore { inner }
    }
}
