//! Authenticated endpoint
//!
//! Mounted behind `require_auth`; the handler only runs for callers
//! with a live session.

use axum::Json;
use serde::Serialize;

use crate::auth::CurrentUser;

#[derive(Debug, Serialize)]
pub struct SecureResponse {
    pub message: String,
}

/// GET /api/secure
pub async fn secure(CurrentUser(session): CurrentUser) -> Json<SecureResponse> {
    let name = session.name.as_deref().unwrap_or_default();
    Json(SecureResponse {
        message: format!("This is a secure endpoint. Welcome, {name}!"),
    })
}
