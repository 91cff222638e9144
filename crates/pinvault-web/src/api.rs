//! REST API route handlers.
//!
//! Provides login and logout, the session-gated entry endpoints, and a
//! database health probe. Handlers stay thin: they pull the session and
//! client address out of the request, call into the vault, and shape JSON.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};

use pinvault_store::Session;
use pinvault_vault::{NewEntry, VaultError};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{SESSION_COOKIE, WebConfig};

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The session presented by the client's cookie, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    /// The raw id from the cookie, whether or not it resolves.
    pub presented: Option<String>,
    /// The live session the id resolves to.
    pub session: Option<Session>,
}

impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(presented) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) else {
            return Ok(Self::default());
        };

        let session = state.auth.session(&presented).await;
        Ok(Self {
            presented: Some(presented),
            session,
        })
    }
}

/// The rate-limit key for the request, per the configured policy.
#[derive(Debug, Clone)]
pub struct ClientAddress(pub String);

impl FromRequestParts<Arc<AppState>> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(
            state.config.client_address.resolve(peer, &parts.headers),
        ))
    }
}

fn session_cookie(config: &WebConfig, id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.cookie_secure)
        .build()
}

// ---------------------------------------------------------------------------
// POST /login
// ---------------------------------------------------------------------------

/// Request body for `POST /login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub pin: String,
}

/// Verify the PIN and issue a fresh session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientAddress(client): ClientAddress,
    current: CurrentSession,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let Json(request) = body?;

    let session = state
        .auth
        .login(&request.pin, &client, current.presented.as_deref())
        .await?;

    let jar = jar.add(session_cookie(&state.config, session.id));
    Ok((jar, Json(json!({ "success": true }))))
}

// ---------------------------------------------------------------------------
// POST /logout
// ---------------------------------------------------------------------------

/// Destroy the current session and expire the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(id) = current.presented.as_deref() {
        state.auth.logout(id).await;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// /passwords
// ---------------------------------------------------------------------------

/// List every entry with its password decrypted.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.vault.list_entries(current.session.as_ref()).await?;
    Ok(Json(entries))
}

/// Encrypt and store a new entry.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    body: Result<Json<NewEntry>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    // An unauthenticated caller gets 401 even when the body is malformed.
    pinvault_vault::require_authenticated(current.session.as_ref())?;
    let Json(entry) = body?;

    let created = state
        .vault
        .create_entry(current.session.as_ref(), entry)
        .await?;

    Ok(Json(json!({
        "success": true,
        "id": created.id,
        "website": created.website,
        "username": created.username,
        "password": created.password,
    })))
}

/// Query parameters for `DELETE /passwords`.
#[derive(Deserialize)]
pub struct DeleteParams {
    pub id: Option<String>,
}

/// Delete one entry by id.
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    query: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    // The session is checked before the query string is looked at.
    pinvault_vault::require_authenticated(current.session.as_ref())?;

    let id = query
        .ok()
        .and_then(|Query(params)| params.id)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| VaultError::InvalidInput("Invalid or missing ID for deletion".into()))?;

    state
        .vault
        .delete_entry(current.session.as_ref(), id)
        .await?;

    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report whether the database answers.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": true })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "database": false })),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Unsupported methods
// ---------------------------------------------------------------------------

/// `405` with the usual `{error}` body for a known path.
pub async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not supported" })),
    )
}
