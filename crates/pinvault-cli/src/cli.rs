//! CLI argument definitions for pinvault.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// pinvault -- a PIN-protected password vault.
#[derive(Parser)]
#[command(
    name = "pinvault",
    version,
    about = "pinvault -- PIN-protected password vault",
    long_about = "A single-user password vault served over HTTP. Entries are encrypted \
                  with AES-256-GCM and the vault is unlocked with a 4-digit PIN."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind the HTTP server to (overrides the config file).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the config file).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Hash and store the master PIN.
    SetupPin {
        /// The 4-digit PIN.
        pin: String,

        /// Replace an existing PIN.
        #[arg(long)]
        force: bool,
    },

    /// Print a fresh base64 encryption key.
    GenKey,

    /// Show database, PIN and key status.
    Status,
}
