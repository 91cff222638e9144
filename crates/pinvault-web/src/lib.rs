//! HTTP interface for pinvault.
//!
//! This crate exposes the vault over a small JSON API:
//!
//! - `POST /login`, `POST /logout`: PIN login and session teardown.
//! - `GET|POST|DELETE /passwords`: the session-gated entry API.
//! - `GET /health`: database reachability.
//!
//! Every route is also mounted under `/api`. An optional static directory
//! (the browser frontend) is served for all other paths.

pub mod api;
pub mod client;
pub mod error;
pub mod server;
pub mod state;

use std::path::PathBuf;

pub use client::ClientAddressPolicy;
pub use error::ApiError;
pub use server::WebServer;
pub use state::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "pinvault_session";

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Mark the session cookie `Secure` (set when served over HTTPS).
    pub cookie_secure: bool,
    /// How the rate-limit key is derived from a request.
    pub client_address: ClientAddressPolicy,
    /// Directory of static frontend assets, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8080,
            cookie_secure: false,
            client_address: ClientAddressPolicy::Peer,
            static_dir: None,
        }
    }
}
