//! Vault error types.
//!
//! Every public API in this crate returns [`VaultError`]. The variants form
//! the request-failure taxonomy the HTTP layer maps onto status codes, so
//! callers never need to inspect message strings.

use pinvault_store::StoreError;

/// Unified error type for the pinvault vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Request errors -----------------------------------------------------
    /// Malformed request data (bad PIN format, empty fields, bad id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller has no authenticated session.
    #[error("not authenticated")]
    Unauthenticated,

    /// The submitted PIN did not match the stored hash.
    #[error("incorrect PIN")]
    InvalidCredentials,

    /// Too many failed attempts from this client inside the window.
    #[error("too many failed login attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The referenced vault entry does not exist.
    #[error("entry not found: id={id}")]
    NotFound { id: i64 },

    // -- Server-side errors -------------------------------------------------
    /// No master PIN has been set up yet.
    #[error("vault PIN not configured")]
    NotConfigured,

    /// A master PIN already exists and overwriting was not requested.
    #[error("vault PIN already configured")]
    AlreadyConfigured,

    /// Encryption, decryption, hashing or key handling failed.
    #[error("crypto error: {reason}")]
    Crypto { reason: String },

    /// The storage layer failed during a primary operation.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A blocking task was cancelled or panicked.
    #[error("internal vault error: {0}")]
    Internal(String),
}

impl VaultError {
    pub(crate) fn crypto(reason: impl Into<String>) -> Self {
        Self::Crypto {
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;
