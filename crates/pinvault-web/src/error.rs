//! Mapping from vault errors to HTTP responses.
//!
//! Every failure body has the shape `{"error": "<message>"}`. Server-side
//! failures are logged with their detail and answered with a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use pinvault_vault::VaultError;

/// An error returned from an API handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A failure reported by the vault or authenticator.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The request body could not be parsed as the expected JSON.
    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Vault(err) => match err {
                VaultError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                VaultError::Unauthenticated | VaultError::InvalidCredentials => {
                    StatusCode::UNAUTHORIZED
                }
                VaultError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                VaultError::NotFound { .. } => StatusCode::NOT_FOUND,
                VaultError::AlreadyConfigured => StatusCode::CONFLICT,
                VaultError::NotConfigured
                | VaultError::Crypto { .. }
                | VaultError::Storage(_)
                | VaultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The message placed in the response body.
    fn message(&self) -> String {
        match self {
            Self::Body(_) => "Invalid request body".into(),
            Self::Vault(err) => match err {
                VaultError::InvalidInput(msg) => msg.clone(),
                VaultError::Unauthenticated => "Not authenticated".into(),
                VaultError::InvalidCredentials => "Incorrect PIN".into(),
                VaultError::RateLimited { .. } => {
                    "Too many failed login attempts. Please try again later.".into()
                }
                VaultError::NotFound { .. } => "Entry not found".into(),
                VaultError::NotConfigured => {
                    "Vault PIN not configured on server. Setup required.".into()
                }
                VaultError::AlreadyConfigured => "Vault PIN already configured".into(),
                VaultError::Crypto { .. } | VaultError::Storage(_) | VaultError::Internal(_) => {
                    "Internal server error".into()
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut response = (status, Json(json!({ "error": self.message() }))).into_response();

        if let Self::Vault(VaultError::RateLimited { retry_after_secs }) = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
        }

        response
    }
}
