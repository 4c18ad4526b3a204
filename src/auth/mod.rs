//! OAuth authentication
//!
//! Handles:
//! - Identity provider sign-in flow (Google)
//! - Session management
//! - Authentication middleware

mod google;
mod middleware;
mod oauth;
pub mod provider;
pub mod session;

pub use google::GoogleProvider;
pub use middleware::{CurrentUser, MaybeUser, require_auth};
pub use oauth::{CALLBACK_PATH, auth_router};
pub use provider::{Identity, IdentityProvider};
pub use session::{
    CookieSessionStore, Session, SessionStore, create_session_token, verify_session_token,
};
