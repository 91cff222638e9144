//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes under both
//! their bare paths and `/api`, and runs the HTTP listener.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use pinvault_store::{Database, SessionStore};
use pinvault_vault::{Authenticator, Cipher, RateLimitPolicy, Vault};

use crate::WebConfig;
use crate::api;
use crate::state::AppState;

/// The pinvault web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address, cookie and client address configuration.
    /// * `db` - A migrated database handle.
    /// * `cipher` - The entry encryption cipher.
    /// * `sessions` - The session record store.
    /// * `rate_limit` - Login rate-limiting policy.
    pub fn new(
        config: WebConfig,
        db: Database,
        cipher: Cipher,
        sessions: SessionStore,
        rate_limit: RateLimitPolicy,
    ) -> Self {
        let state = Arc::new(AppState {
            config: config.clone(),
            auth: Authenticator::new(db.clone(), sessions, rate_limit),
            vault: Vault::new(db.clone(), cipher),
            db,
        });
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        let routes = api_routes();
        let mut router = Router::new().merge(routes.clone()).nest("/api", routes);

        if let Some(dir) = &self.config.static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }

    /// Bind the configured address and serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> std::io::Result<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "starting web server");

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received");
        })
        .await
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(api::login))
        .route("/logout", post(api::logout))
        .route(
            "/passwords",
            get(api::list_entries)
                .post(api::create_entry)
                .delete(api::delete_entry),
        )
        .route("/health", get(api::health))
        .method_not_allowed_fallback(api::method_not_allowed)
}
