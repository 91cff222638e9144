//! CLI entry point for pinvault.
//!
//! This binary provides the `pinvault` command with subcommands for serving
//! the vault, setting the master PIN, generating a key, and checking status.

mod cli;
mod config;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pinvault_store::{ConfigStore, Database};
use pinvault_vault::crypto::generate_key;
use pinvault_vault::{Authenticator, Cipher, VaultError};
use pinvault_web::WebServer;

use crate::cli::{Cli, Commands};
use crate::config::{ENV_ENCRYPTION_KEY, PinvaultConfig};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = PinvaultConfig::load(&cli.config)?;
    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(config, bind, port).await,
        Commands::SetupPin { pin, force } => cmd_setup_pin(&config, &pin, force).await,
        Commands::GenKey => cmd_gen_key(),
        Commands::Status => cmd_status(&config).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(
    mut config: PinvaultConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let Some(key) = config.security.encryption_key.as_deref() else {
        bail!("no encryption key configured; set {ENV_ENCRYPTION_KEY} (see `pinvault gen-key`)");
    };
    let cipher = Cipher::from_base64_key(key).context("invalid encryption key")?;

    let db = open_database(&config.database.path).await?;

    if !pin_configured(&db).await? {
        warn!("no master PIN configured; logins fail until `pinvault setup-pin` is run");
    }

    let server = WebServer::new(
        config.web_config(),
        db,
        cipher,
        config.session_store(),
        config.rate_limit_policy(),
    );
    info!(addr = %server.addr(), "pinvault ready");

    server.start().await.context("web server failed")?;
    info!("server stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: setup-pin
// ---------------------------------------------------------------------------

async fn cmd_setup_pin(config: &PinvaultConfig, pin: &str, force: bool) -> Result<()> {
    let db = open_database(&config.database.path).await?;
    let auth = Authenticator::new(db, config.session_store(), config.rate_limit_policy());

    match auth.configure_pin(pin, force).await {
        Ok(()) => {
            println!("Master PIN stored.");
            Ok(())
        }
        Err(VaultError::AlreadyConfigured) => {
            bail!("a master PIN is already configured; pass --force to replace it")
        }
        Err(VaultError::InvalidInput(_)) => bail!("the PIN must be exactly 4 digits"),
        Err(e) => Err(e).context("failed to store master PIN"),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: gen-key
// ---------------------------------------------------------------------------

fn cmd_gen_key() -> Result<()> {
    let key = generate_key().context("failed to generate key")?;
    println!("{key}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(config: &PinvaultConfig) -> Result<()> {
    println!("pinvault v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Database:       {}", config.database.path.display());

    match open_database(&config.database.path).await {
        Ok(db) => {
            let reachable = db.ping().await.is_ok();
            println!("  Reachable:      {}", yes_no(reachable));

            match pin_configured(&db).await {
                Ok(configured) => println!("  PIN configured: {}", yes_no(configured)),
                Err(e) => println!("  PIN configured: unknown ({e:#})"),
            }
        }
        Err(e) => println!("  Reachable:      no ({e:#})"),
    }

    let key_status = match config.security.encryption_key.as_deref() {
        None => "missing".to_owned(),
        Some(key) => match Cipher::from_base64_key(key) {
            Ok(_) => "present".to_owned(),
            Err(e) => format!("invalid ({e})"),
        },
    };
    println!("  Encryption key: {key_status}");
    println!(
        "  Listen address: {}:{}",
        config.server.bind, config.server.port
    );

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open the database, creating its parent directory if needed.
async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = Database::open_and_migrate(path.to_path_buf())
        .await
        .with_context(|| format!("failed to open database {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(db)
}

/// Whether a master PIN hash is stored.
async fn pin_configured(db: &Database) -> Result<bool> {
    let hash = ConfigStore::new(db.clone())
        .pin_hash()
        .await
        .context("failed to read vault config")?;
    Ok(hash.is_some())
}

/// Initialize the tracing subscriber, honouring `RUST_LOG` when set.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
