//! Supabase GoTrue client: password sign-in, token refresh and sign-out.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{
    unix_seconds, AccessTokenSource, AuthError, AuthResult, AuthSession, AuthUser,
    SessionPersistence, SessionProvider,
};
use crate::api_error::classify;
use crate::remote::{map_transport_error, parse_error_body, RemoteError};
use crate::util::is_http_url;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Pause after a failed refresh before contacting the auth server again.
const REFRESH_RETRY_INTERVAL: Duration = Duration::from_secs(30);

pub struct SupabaseAuthClient<S> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
    /// Serializes refreshes; holds the time of the last transient failure.
    refresh: Mutex<Option<Instant>>,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(supabase_url: &str, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let base = supabase_url.trim().trim_end_matches('/');
        if !is_http_url(base) {
            return Err(AuthError::Config(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        let auth_url = if base.ends_with("/auth/v1") {
            base.to_string()
        } else {
            format!("{base}/auth/v1")
        };

        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| AuthError::Config(format!("failed to build auth client: {error}")))?;

        Ok(Self {
            auth_url,
            anon_key,
            client,
            store,
            refresh: Mutex::new(None),
        })
    }

    /// The stored session, refreshed first when it has expired.
    ///
    /// Only a refresh the auth server rejects signs the user out. While the
    /// server is unreachable or failing, the expired session is returned as
    /// is so queued work keeps its owner.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        let mut last_failure = self.refresh.lock().await;
        // A concurrent caller may have refreshed it already.
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }
        if matches!(*last_failure, Some(at) if at.elapsed() < REFRESH_RETRY_INTERVAL) {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(session) => {
                *last_failure = None;
                Ok(Some(session))
            }
            Err(error) if error.is_rejection() => {
                *last_failure = None;
                tracing::warn!(
                    user_id = %stored.user.id,
                    "Stored session rejected, signing out: {}",
                    error
                );
                self.store.clear_session()?;
                Ok(None)
            }
            Err(error) => {
                *last_failure = Some(Instant::now());
                tracing::warn!(
                    user_id = %stored.user.id,
                    "Keeping expired session, refresh failed: {}",
                    error
                );
                Ok(Some(stored))
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingCredential("Email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingCredential("Password"));
        }
        self.grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::MissingCredential("Refresh token"));
        }
        self.grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Revoke the session server-side and forget it locally. A token the
    /// server already refuses counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        match self.send(request).await {
            Ok(_) => {}
            Err(AuthError::Remote(error)) if error.status == Some(401) => {}
            Err(error) => return Err(error),
        }
        self.store.clear_session()
    }

    async fn grant(&self, grant_type: &str, payload: Value) -> AuthResult<AuthSession> {
        let request = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&payload);

        let body = self.send(request).await?;
        let session = serde_json::from_str::<TokenGrant>(&body)?.into_session()?;
        self.store.save_session(&session)?;
        tracing::debug!(user_id = %session.user.id, grant_type, "Stored auth session");
        Ok(session)
    }

    async fn send(&self, request: RequestBuilder) -> AuthResult<String> {
        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(AuthError::Remote(classify(RemoteError::Api {
                status: Some(status.as_u16()),
                body: parse_error_body(status, &body),
            })))
        }
    }
}

impl<S: SessionPersistence> SessionProvider for SupabaseAuthClient<S> {
    async fn current_user(&self) -> AuthResult<Option<AuthUser>> {
        Ok(self.restore_session().await?.map(|session| session.user))
    }
}

impl<S: SessionPersistence> AccessTokenSource for SupabaseAuthClient<S> {
    async fn access_token(&self) -> AuthResult<Option<String>> {
        Ok(self
            .restore_session()
            .await?
            .map(|session| session.access_token))
    }
}

fn transport_failure(error: reqwest::Error) -> AuthError {
    AuthError::Remote(classify(map_transport_error(error)))
}

/// Body of a successful `/token` grant.
#[derive(Deserialize)]
struct TokenGrant {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TokenGrant {
    fn into_session(self) -> AuthResult<AuthSession> {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| unix_seconds().saturating_add(secs)));

        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                })
            }
            _ => Err(AuthError::NoSession),
        }
    }
}
