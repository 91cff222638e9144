//! Encrypted password vault for pinvault.
//!
//! This crate holds the security core of the application: encryption of
//! stored passwords, hashing and verification of the master PIN, login rate
//! limiting, session issuance, and the session-gated entry API.
//!
//! # Modules
//!
//! - [`crypto`]: AES-256-GCM sealing, Argon2id PIN hashing, CSPRNG helpers.
//! - [`auth`]: PIN login flow, rate limiting, session regeneration.
//! - [`store`]: session-gated CRUD over encrypted entries.
//! - [`error`]: Unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pinvault_store::{Database, SessionStore};
//! use pinvault_vault::{Authenticator, Cipher, NewEntry, RateLimitPolicy, Vault};
//!
//! # async fn example() -> pinvault_vault::Result<()> {
//! let db = Database::open_and_migrate("data/pinvault.db").await?;
//! let auth = Authenticator::new(
//!     db.clone(),
//!     SessionStore::builder().build(),
//!     RateLimitPolicy::default(),
//! );
//! let vault = Vault::new(db, Cipher::from_base64_key("...")?);
//!
//! let session = auth.login("1541", "127.0.0.1", None).await?;
//! vault
//!     .create_entry(Some(&session), NewEntry::new("example.com", "bob", "secret1"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod crypto;
pub mod error;
pub mod store;

pub use auth::{Authenticator, RateLimitPolicy, require_authenticated};
pub use crypto::Cipher;
pub use error::{Result, VaultError};
pub use store::{EntryView, NewEntry, Vault};
