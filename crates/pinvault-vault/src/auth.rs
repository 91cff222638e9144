//! PIN authentication, rate limiting and session establishment.
//!
//! [`Authenticator::login`] runs the full flow for one login request:
//!
//! 1. reject anything that is not exactly four ASCII digits,
//! 2. refuse the request outright when the client already has
//!    `max_attempts` failures inside the trailing window,
//! 3. load the master PIN hash (`NotConfigured` if there is none),
//! 4. verify the PIN; on success clear the client's failures and issue a
//!    brand-new session id, on failure record the attempt.
//!
//! Attempt bookkeeping is best effort: a failure to record or clear attempts
//! is logged and never changes the outcome of the login itself.
//!
//! The count → verify → record sequence is not atomic, so concurrent
//! requests from one address can slightly exceed the limit.

use std::time::Duration;

use chrono::Utc;
use pinvault_store::{
    AttemptLedger, ConfigStore, Database, MASTER_PIN_HASH_KEY, Session, SessionStore,
};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{Result, VaultError};

/// Number of digits in the master PIN.
pub const PIN_LEN: usize = 4;

/// Failed-login throttling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Failures tolerated inside the window before logins are refused.
    pub max_attempts: u32,
    /// Length of the trailing window.
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),
        }
    }
}

/// Validate the PIN format without touching storage.
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == PIN_LEN && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(VaultError::InvalidInput("Invalid PIN format submitted".into()))
    }
}

/// Gate for operations that need an authenticated session.
pub fn require_authenticated(session: Option<&Session>) -> Result<&Session> {
    match session {
        Some(session) if session.authenticated => Ok(session),
        _ => Err(VaultError::Unauthenticated),
    }
}

/// Validates PINs against the config store and manages sessions.
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: ConfigStore,
    ledger: AttemptLedger,
    sessions: SessionStore,
    rate_limit: RateLimitPolicy,
}

impl Authenticator {
    /// Create an authenticator over `db` issuing sessions into `sessions`.
    pub fn new(db: Database, sessions: SessionStore, rate_limit: RateLimitPolicy) -> Self {
        Self {
            config: ConfigStore::new(db.clone()),
            ledger: AttemptLedger::new(db),
            sessions,
            rate_limit,
        }
    }

    /// Authenticate `pin` for `client_address`.
    ///
    /// `previous_session` is the session id the client presented, if any. It
    /// is invalidated on success so a planted id can never become
    /// authenticated.
    pub async fn login(
        &self,
        pin: &str,
        client_address: &str,
        previous_session: Option<&str>,
    ) -> Result<Session> {
        validate_pin(pin)?;

        let now = Utc::now().timestamp();
        let window_start = self.window_start(now);
        self.check_rate_limit(client_address, window_start).await?;

        let stored_hash = self
            .config
            .pin_hash()
            .await?
            .ok_or(VaultError::NotConfigured)?;

        let candidate = Zeroizing::new(pin.to_owned());
        let verified =
            tokio::task::spawn_blocking(move || crypto::verify_pin(&candidate, &stored_hash))
                .await?;

        if !verified {
            if let Err(e) = self.ledger.record(client_address, now, window_start).await {
                warn!(client = %client_address, error = %e, "failed to record failed login attempt");
            }
            info!(client = %client_address, "login rejected: incorrect PIN");
            return Err(VaultError::InvalidCredentials);
        }

        if let Err(e) = self.ledger.clear(client_address).await {
            warn!(client = %client_address, error = %e, "failed to clear login attempts");
        }

        if let Some(old) = previous_session {
            self.sessions.remove(old).await;
        }

        let session = Session::authenticated(crypto::session_token()?);
        self.sessions.insert(session.clone()).await;

        info!(client = %client_address, "login succeeded");
        Ok(session)
    }

    /// Destroy a session. Unknown ids are ignored.
    pub async fn logout(&self, session_id: &str) {
        self.sessions.remove(session_id).await;
        debug!("session logged out");
    }

    /// Resolve a session id presented by a client.
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    /// Whether a master PIN hash is stored.
    pub async fn is_configured(&self) -> Result<bool> {
        Ok(self.config.pin_hash().await?.is_some())
    }

    /// Hash and store the master PIN.
    ///
    /// Refuses with [`VaultError::AlreadyConfigured`] when a PIN exists and
    /// `overwrite` is false.
    pub async fn configure_pin(&self, pin: &str, overwrite: bool) -> Result<()> {
        validate_pin(pin)?;

        let pin = Zeroizing::new(pin.to_owned());
        let hash = tokio::task::spawn_blocking(move || crypto::hash_pin(&pin)).await??;

        if overwrite {
            self.config.set(MASTER_PIN_HASH_KEY, &hash).await?;
        } else if !self
            .config
            .insert_if_absent(MASTER_PIN_HASH_KEY, &hash)
            .await?
        {
            return Err(VaultError::AlreadyConfigured);
        }

        info!("master PIN hash stored");
        Ok(())
    }

    fn window_start(&self, now: i64) -> i64 {
        let window_secs = i64::try_from(self.rate_limit.window.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(window_secs)
    }

    async fn check_rate_limit(&self, client_address: &str, since: i64) -> Result<()> {
        let window_secs = self.rate_limit.window.as_secs();

        match self.ledger.count_since(client_address, since).await {
            Ok(failures) if failures >= self.rate_limit.max_attempts => {
                warn!(client = %client_address, failures, "login rate limited");
                Err(VaultError::RateLimited {
                    retry_after_secs: window_secs,
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(client = %client_address, error = %e, "rate limit check failed, allowing attempt");
                Ok(())
            }
        }
    }
}
