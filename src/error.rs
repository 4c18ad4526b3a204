//! Error types for Authgate
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Each variant maps to one HTTP status code and a JSON error body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Session token signature mismatch (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Identity provider reported a failed or denied sign-in (401)
    #[error("Sign-in was not completed: {0}")]
    ProviderDenied(String),

    /// Identity provider could not be reached or rejected the exchange (502)
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Session store failure (500)
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and metric label for this error
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            AppError::ProviderDenied(_) => (StatusCode::UNAUTHORIZED, "provider_denied"),
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "http_client"),
            AppError::SessionStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "session_store"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encryption"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// HTTP status this error renders as
    pub fn status(&self) -> StatusCode {
        self.classify().0
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Server-side failures are logged and rendered with a generic
    /// message so provider or store internals don't leak to clients.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.classify();
        let error_message = match &self {
            AppError::SessionStore(_) => "Session store error".to_string(),
            AppError::Encryption(_) | AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_map_to_bad_gateway() {
        assert_eq!(
            AppError::Provider("token endpoint unreachable".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn denied_consent_maps_to_unauthorized() {
        let response = AppError::ProviderDenied("access_denied".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn session_store_failure_is_a_server_error() {
        let response = AppError::SessionStore("backend down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
