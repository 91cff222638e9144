//! Service configuration.
//!
//! Reads `config/default.toml` (or the path given with `--config`) into
//! [`PinvaultConfig`], then applies `PINVAULT_*` environment overrides. A
//! missing file yields the defaults; every field has one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use pinvault_vault::RateLimitPolicy;
use pinvault_web::{ClientAddressPolicy, WebConfig};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

pub const ENV_ENCRYPTION_KEY: &str = "PINVAULT_ENCRYPTION_KEY";
pub const ENV_DB_PATH: &str = "PINVAULT_DB_PATH";
pub const ENV_BIND: &str = "PINVAULT_BIND";
pub const ENV_PORT: &str = "PINVAULT_PORT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PinvaultConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub security: SecuritySection,
    pub session: SessionSection,
    pub rate_limit: RateLimitSection,
    pub logging: LoggingSection,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Set the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
    /// Frontend assets to serve at `/`.
    pub static_dir: Option<PathBuf>,
    pub client_address: ClientAddressPolicy,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
            cookie_secure: false,
            static_dir: None,
            client_address: ClientAddressPolicy::Peer,
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/pinvault.db"),
        }
    }
}

/// `[security]`
///
/// The key is normally supplied through `PINVAULT_ENCRYPTION_KEY` rather
/// than written to the file.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Base64-encoded 32-byte AES key.
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for SecuritySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuritySection")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// `[session]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub max_sessions: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            max_lifetime_secs: 12 * 60 * 60,
            max_sessions: 1000,
        }
    }
}

/// `[rate_limit]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_attempts: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            window_secs: policy.window.as_secs(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl PinvaultConfig {
    /// Load from `path` and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse `path`, or return the defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply `PINVAULT_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(ENV_ENCRYPTION_KEY).filter(|k| !k.trim().is_empty()) {
            self.security.encryption_key = Some(key.trim().to_owned());
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {port}"))?;
        }
        Ok(())
    }

    pub fn web_config(&self) -> WebConfig {
        WebConfig {
            bind_addr: self.server.bind.clone(),
            port: self.server.port,
            cookie_secure: self.server.cookie_secure,
            client_address: self.server.client_address.clone(),
            static_dir: self.server.static_dir.clone(),
        }
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_attempts: self.rate_limit.max_attempts,
            window: Duration::from_secs(self.rate_limit.window_secs),
        }
    }

    pub fn session_store(&self) -> pinvault_store::SessionStore {
        pinvault_store::SessionStore::builder()
            .max_sessions(self.session.max_sessions)
            .idle_timeout(Duration::from_secs(self.session.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.session.max_lifetime_secs))
            .build()
    }
}
