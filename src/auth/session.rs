//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed beyond a revocation list
//! of logged-out session ids.

use axum::async_trait;
use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use super::provider::Identity;
use crate::error::{AppError, Result};

/// User session data
///
/// Stored in a signed cookie. Contains the identity the provider
/// returned at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session id (ULID), used for revocation
    pub id: String,
    /// Provider subject identifier
    pub subject: String,
    /// Display name from the provider
    pub name: Option<String>,
    /// Email address from the provider
    pub email: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for a freshly authenticated identity
    pub fn new(identity: &Identity, max_age: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            subject: identity.subject.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            created_at: now,
            expires_at: now + max_age,
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(session: &Session, secret: &str) -> Result<String> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let signature = sign(payload_b64.as_bytes(), secret)?
        .finalize()
        .into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns error if signature is invalid, token is malformed,
/// or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    sign(payload_b64.as_bytes(), secret)?
        .verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

fn sign(payload: &[u8], secret: &str) -> Result<hmac::Hmac<sha2::Sha256>> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload);
    Ok(mac)
}

/// Issues, reads and invalidates session credentials
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a credential for a newly authenticated identity
    async fn issue(&self, identity: &Identity) -> Result<String>;

    /// Resolve a presented credential to its live session
    async fn current(&self, token: &str) -> Result<Session>;

    /// Make the session's credential unusable for all later requests
    async fn invalidate(&self, session: &Session) -> Result<()>;
}

/// Signed-cookie session store
///
/// Tokens are self-contained; logout puts the session id on a
/// revocation list that lives as long as a token could.
pub struct CookieSessionStore {
    secret: String,
    max_age: Duration,
    revoked: Cache<String, ()>,
}

impl CookieSessionStore {
    pub fn new(secret: impl Into<String>, max_age_seconds: i64) -> Self {
        let ttl = std::time::Duration::from_secs(max_age_seconds.max(1) as u64);
        Self {
            secret: secret.into(),
            max_age: Duration::seconds(max_age_seconds),
            revoked: Cache::builder().time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn issue(&self, identity: &Identity) -> Result<String> {
        let session = Session::new(identity, self.max_age);
        create_session_token(&session, &self.secret)
    }

    async fn current(&self, token: &str) -> Result<Session> {
        let session = verify_session_token(token, &self.secret)?;
        if self.revoked.contains_key(&session.id) {
            return Err(AppError::Unauthorized);
        }
        Ok(session)
    }

    async fn invalidate(&self, session: &Session) -> Result<()> {
        self.revoked.insert(session.id.clone(), ()).await;
        tracing::debug!(session_id = %session.id, "Session revoked");
        Ok(())
    }
}
