//! Sign-in endpoints
//!
//! Routes the browser through the identity provider and reports the
//! resulting session state as JSON.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use super::middleware::{MaybeUser, current_session};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::metrics::{LOGINS_TOTAL, LOGOUTS_TOTAL};

/// Path the provider returns the browser to after consent
pub const CALLBACK_PATH: &str = "/api/auth/callback";

/// Create authentication router
///
/// Routes (nested under `/api/auth`):
/// - GET /login - Redirect to the identity provider
/// - GET /callback - Provider callback
/// - GET /logout - Invalidate the session
/// - GET /status - Current session state
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/status", get(status))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    message: &'static str,
    user: Option<String>,
}

/// Session state as seen by the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStatus {
    is_authenticated: bool,
    user_name: Option<String>,
}

// =============================================================================
// Login
// =============================================================================

/// GET /api/auth/login
///
/// Redirects the user to the provider's consent page.
async fn login(State(state): State<AppState>) -> Result<Response> {
    let url = state.provider.authorization_url(CALLBACK_PATH)?;
    tracing::debug!(provider = state.provider.name(), "Starting sign-in challenge");

    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Provider-reported error (e.g. "access_denied")
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /api/auth/callback
///
/// With a `code`, exchanges it for an identity and issues the session
/// cookie. Without one, reports whatever session is already present.
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(current): MaybeUser,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        LOGINS_TOTAL.with_label_values(&["denied"]).inc();
        tracing::warn!(
            provider = state.provider.name(),
            %error,
            description = ?query.error_description,
            "Identity provider reported a failed sign-in"
        );
        return Err(AppError::ProviderDenied(error));
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Ok(Json(LoginResponse {
            message: "Login successful",
            user: current.and_then(|session| session.name),
        })
        .into_response());
    };

    let identity = match state.provider.exchange(&code, CALLBACK_PATH).await {
        Ok(identity) => identity,
        Err(error) => {
            LOGINS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(error);
        }
    };
    let token = state.sessions.issue(&identity).await?;

    LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(
        provider = state.provider.name(),
        subject = %identity.subject,
        "User signed in"
    );

    let jar = jar.add(session_cookie(&state.config, token));
    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful",
            user: identity.name,
        }),
    )
        .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// GET /api/auth/logout
///
/// Invalidates the current session and clears the session cookie.
/// A session store failure fails the request rather than reporting
/// a logout that did not happen.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    if let Some(session) = current_session(&headers, &state).await? {
        state.sessions.invalidate(&session).await?;
        LOGOUTS_TOTAL.inc();
        tracing::info!(subject = %session.subject, "User signed out");
    }

    let jar = jar.remove(clear_session_cookie(&state.config));
    Ok((
        jar,
        Json(MessageResponse {
            message: "Logout successful",
        }),
    ))
}

// =============================================================================
// Status
// =============================================================================

/// GET /api/auth/status
async fn status(MaybeUser(current): MaybeUser) -> Json<AuthStatus> {
    Json(match current {
        Some(session) => AuthStatus {
            is_authenticated: true,
            user_name: session.name,
        },
        None => AuthStatus {
            is_authenticated: false,
            user_name: None,
        },
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}

fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((config.auth.cookie_name.clone(), String::new()))
        .path("/")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn status_serializes_camel_case() {
        let body = serde_json::to_value(AuthStatus {
            is_authenticated: false,
            user_name: None,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "isAuthenticated": false, "userName": null })
        );
    }

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let cookie = session_cookie(&valid_config(), "token".to_string());

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn session_cookie_is_secure_over_https() {
        let mut config = valid_config();
        config.server.protocol = "https".to_string();

        let cookie = session_cookie(&config, "token".to_string());
        assert_eq!(cookie.secure(), Some(true));
    }
}
