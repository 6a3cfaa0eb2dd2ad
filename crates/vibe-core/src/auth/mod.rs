//! Identity collaborator: who is signed in, and which token authorizes
//! their requests.

mod gotrue;

use std::fmt;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api_error::ApiError;
use crate::util::unix_timestamp_millis;

pub use gotrue::SupabaseAuthClient;

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// Tokens issued at sign-in, persisted between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_seconds() + EXPIRY_MARGIN_SECS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    Config(String),
    #[error("{0} is required")]
    MissingCredential(&'static str),
    /// The auth endpoint failed or was unreachable
    #[error("Auth request failed: {0}")]
    Remote(ApiError),
    #[error("Auth response did not include an active session")]
    NoSession,
    #[error("Failed to parse auth payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

impl AuthError {
    /// The auth server refused the credentials outright. Timeouts,
    /// throttling, server faults and unreachable hosts say nothing about
    /// whether a stored session is still valid.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Remote(error) => {
                !error.is_transient() && matches!(error.status, Some(400..=499))
            }
            _ => false,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Resolves the signed-in user for domain services.
pub trait SessionProvider: Send + Sync {
    /// `None` when nobody is signed in.
    fn current_user(&self) -> impl Future<Output = AuthResult<Option<AuthUser>>> + Send;
}

/// Supplies the bearer token for each remote request.
pub trait AccessTokenSource: Send + Sync {
    /// `None` when requests should go out with the anon key.
    fn access_token(&self) -> impl Future<Output = AuthResult<Option<String>>> + Send;
}

/// Where sessions live between runs.
pub trait SessionPersistence: Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Fixed user, switchable at runtime.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<AuthUser>>,
}

impl StaticSession {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self::from_user(Some(AuthUser::new(user_id)))
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn from_user(user: Option<AuthUser>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

impl SessionProvider for StaticSession {
    async fn current_user(&self) -> AuthResult<Option<AuthUser>> {
        Ok(self
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

fn unix_seconds() -> i64 {
    unix_timestamp_millis() / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser::new("user-1"),
        }
    }

    #[test]
    fn debug_output_omits_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("user-1"));
    }

    #[test]
    fn sessions_expire_a_minute_early() {
        assert!(session(unix_seconds() + 30).is_expired());
        assert!(!session(unix_seconds() + 3600).is_expired());
    }

    #[test]
    fn only_client_errors_reject_a_session() {
        let remote = |status| AuthError::Remote(ApiError::new("refused").with_status(status));

        assert!(remote(400).is_rejection());
        assert!(remote(401).is_rejection());
        assert!(!remote(429).is_rejection());
        assert!(!remote(503).is_rejection());
        assert!(!AuthError::Remote(ApiError::new("down").with_code("network")).is_rejection());
        assert!(!AuthError::SecureStorage("locked".to_string()).is_rejection());
    }

    #[tokio::test]
    async fn static_session_switches_users() {
        let session = StaticSession::signed_in("u1");
        assert_eq!(session.current_user().await.unwrap().unwrap().id, "u1");

        session.set_user(None);
        assert!(session.current_user().await.unwrap().is_none());
    }
}
