//! Authentication middleware
//!
//! Protects routes that require authentication.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::Session;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::AUTH_REJECTIONS_TOTAL;

fn extract_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(cookie_name).map(|cookie| cookie.value().to_owned())
        })
}

async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = extract_token_from_headers(headers, &state.config.auth.cookie_name)
        .ok_or(AppError::Unauthorized)?;
    state.sessions.current(&token).await
}

/// Resolve the presented credential, if any
///
/// A missing, corrupt, expired or revoked credential is `None`. Store
/// failures are returned as errors.
pub(super) async fn current_session(
    headers: &HeaderMap,
    state: &AppState,
) -> crate::error::Result<Option<Session>> {
    match authenticate(headers, state).await {
        Ok(session) => Ok(Some(session)),
        Err(AppError::Unauthorized | AppError::InvalidSignature) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Middleware to require authentication
///
/// Extracts and verifies session from cookie or Authorization header.
/// Adds Session to request extensions if valid; otherwise the request
/// is rejected with 401 before the handler runs.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/secure", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = match authenticate(request.headers(), &state).await {
        Ok(session) => session,
        Err(error) => {
            AUTH_REJECTIONS_TOTAL.inc();
            tracing::debug!(
                path = %request.uri().path(),
                reason = %error,
                "Rejected unauthenticated request"
            );
            return Err(AppError::Unauthorized);
        }
    };

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// Use in handlers to get the current session.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {:?}", session.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let session = authenticate(&parts.headers, &state)
            .await
            .map_err(|_| AppError::Unauthorized)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error. Corrupt,
/// expired and revoked credentials all read as anonymous, and so do
/// store failures; handlers that change session state use
/// [`current_session`] instead.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = authenticate(&parts.headers, &app_state).await.ok();

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-header"));
        headers.insert("Cookie", HeaderValue::from_static("session=from-cookie"));

        assert_eq!(
            extract_token_from_headers(&headers, "session").as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn cookie_is_read_by_configured_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Cookie",
            HeaderValue::from_static("other=x; authgate_session=abc"),
        );

        assert_eq!(
            extract_token_from_headers(&headers, "authgate_session").as_deref(),
            Some("abc")
        );
        assert_eq!(extract_token_from_headers(&headers, "session"), None);
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        assert_eq!(extract_token_from_headers(&headers, "session"), None);
    }
}
