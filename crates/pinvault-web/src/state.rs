//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and handed to every handler. It owns
//! the database handle, the authenticator (with its session store) and the
//! vault, all constructed once at startup.

use pinvault_store::Database;
use pinvault_vault::{Authenticator, Vault};

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Web server configuration.
    pub config: WebConfig,

    /// Database handle, used directly only for health checks.
    pub db: Database,

    /// PIN login, rate limiting and session records.
    pub auth: Authenticator,

    /// Session-gated entry API.
    pub vault: Vault,
}
