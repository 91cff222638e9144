//! # pinvault-store
//!
//! Storage engine for pinvault.
//!
//! Provides a SQLite handle with WAL pragmas and versioned migrations, one
//! store per table, and the in-memory session record store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  SessionStore  (moka, idle + absolute TTL)  │
//! ├─────────────────────────────────────────────┤
//! │  EntryStore     password_entries            │
//! │  ConfigStore    vault_config                │
//! │  AttemptLedger  login_attempts              │
//! ├─────────────────────────────────────────────┤
//! │  Database (rusqlite WAL, spawn_blocking)    │
//! │  Migrations (versioned, transactional)      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use pinvault_store::{Database, EntryStore};
//!
//! let db = Database::open_and_migrate("data/pinvault.db").await?;
//! let entries = EntryStore::new(db.clone());
//! ```

pub mod attempts;
pub mod config;
pub mod db;
pub mod entries;
pub mod error;
pub mod migration;
pub mod session;

// ── re-exports ───────────────────────────────────────────────────────

pub use attempts::AttemptLedger;
pub use config::{ConfigStore, MASTER_PIN_HASH_KEY};
pub use db::Database;
pub use entries::{EntryRow, EntryStore, NewEntryRow};
pub use error::{StoreError, StoreResult};
pub use session::{Session, SessionStore, SessionStoreBuilder};
