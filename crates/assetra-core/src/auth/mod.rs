//! Token auth against the Assetra backend.
//!
//! Sessions are a JWT access/refresh pair obtained from the token endpoint.
//! Where they are kept is up to the front end (`SessionPersistence`); the
//! sync transport only sees them through [`AccessTokenProvider`].

use std::fmt;

use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::util::{describe_api_error, normalize_text_option};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("Not signed in. Run `assetra auth login` first.")]
    NotSignedIn,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Source of bearer tokens for authenticated requests.
#[allow(async_fn_in_trait)]
pub trait AccessTokenProvider: Send + Sync {
    /// Current cached access token
    fn access_token(&self) -> AuthResult<String>;

    /// Exchange the refresh token for a new access token
    async fn refresh_access_token(&self) -> AuthResult<String>;
}

#[derive(Clone)]
pub struct AuthClient<S: SessionPersistence> {
    token_url: String,
    refresh_url: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> AuthClient<S> {
    pub fn new(config: &ClientConfig, store: S) -> AuthResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            token_url: config.token_endpoint(),
            refresh_url: config.token_refresh_endpoint(),
            client: builder.build()?,
            store,
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Return the persisted session, if any.
    pub fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.store.load_session()
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> AuthResult<AuthSession> {
        let username = validate_credentials(username, password)?;

        let payload = serde_json::json!({
            "username": username,
            "password": password,
        });
        let response = self.send_token_request(&self.token_url, &payload).await?;
        let session = response.into_session(&username, None)?;

        self.store.save_session(&session)?;
        tracing::info!("Signed in as {username}");
        Ok(session)
    }

    /// Refresh `session`, keeping its refresh token when the server does not rotate it.
    pub async fn refresh_session(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        if session.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh": session.refresh_token,
        });
        let response = self.send_token_request(&self.refresh_url, &payload).await?;
        let refreshed = response.into_session(&session.username, Some(&session.refresh_token))?;

        self.store.save_session(&refreshed)?;
        Ok(refreshed)
    }

    /// Forget the local session. Tokens expire server-side on their own.
    pub fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()
    }

    async fn send_token_request(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AuthResult<TokenResponse> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(describe_api_error(status, &body)));
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

/// [`AccessTokenProvider`] backed by an [`AuthClient`] and a cached session.
pub struct SessionTokenProvider<S: SessionPersistence> {
    client: AuthClient<S>,
    session: RwLock<Option<AuthSession>>,
}

impl<S: SessionPersistence> SessionTokenProvider<S> {
    pub fn new(client: AuthClient<S>, session: AuthSession) -> Self {
        Self {
            client,
            session: RwLock::new(Some(session)),
        }
    }

    /// Build a provider from the persisted session.
    pub fn restore(client: AuthClient<S>) -> AuthResult<Self> {
        let session = client.restore_session()?.ok_or(AuthError::NotSignedIn)?;
        Ok(Self::new(client, session))
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().clone()
    }
}

impl<S: SessionPersistence> AccessTokenProvider for SessionTokenProvider<S> {
    fn access_token(&self) -> AuthResult<String> {
        self.session
            .read()
            .as_ref()
            .map(|session| session.access_token.clone())
            .ok_or(AuthError::NotSignedIn)
    }

    async fn refresh_access_token(&self) -> AuthResult<String> {
        let current = self.session().ok_or(AuthError::NotSignedIn)?;
        let refreshed = match self.client.refresh_session(&current).await {
            Ok(refreshed) => refreshed,
            Err(error) => {
                tracing::warn!("Failed to refresh access token: {}", error);
                return Err(error);
            }
        };

        let token = refreshed.access_token.clone();
        *self.session.write() = Some(refreshed);
        Ok(token)
    }
}

fn validate_credentials(username: &str, password: &str) -> AuthResult<String> {
    let username = normalize_text_option(Some(username.to_string()))
        .ok_or_else(|| AuthError::Api("Username is required".to_string()))?;
    if password.is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(username)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Option<String>,
    refresh: Option<String>,
}

impl TokenResponse {
    fn into_session(
        self,
        username: &str,
        previous_refresh: Option<&str>,
    ) -> AuthResult<AuthSession> {
        let access_token = normalize_text_option(self.access).ok_or_else(|| {
            AuthError::Api("Token response did not include an access token".to_string())
        })?;
        let refresh_token = normalize_text_option(self.refresh)
            .or_else(|| previous_refresh.map(ToString::to_string))
            .ok_or_else(|| {
                AuthError::Api("Token response did not include a refresh token".to_string())
            })?;

        Ok(AuthSession {
            access_token,
            refresh_token,
            username: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_response(access: Option<&str>, refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access: access.map(ToString::to_string),
            refresh: refresh.map(ToString::to_string),
        }
    }

    #[test]
    fn sign_in_response_requires_both_tokens() {
        let session = token_response(Some("a1"), Some("r1"))
            .into_session("ops", None)
            .unwrap();
        assert_eq!(session.access_token, "a1");
        assert_eq!(session.refresh_token, "r1");
        assert_eq!(session.username, "ops");

        assert!(token_response(Some("a1"), None)
            .into_session("ops", None)
            .is_err());
        assert!(token_response(None, Some("r1"))
            .into_session("ops", None)
            .is_err());
    }

    #[test]
    fn refresh_keeps_previous_refresh_token_when_not_rotated() {
        let session = token_response(Some("a2"), None)
            .into_session("ops", Some("r1"))
            .unwrap();
        assert_eq!(session.access_token, "a2");
        assert_eq!(session.refresh_token, "r1");
    }

    #[test]
    fn credentials_are_validated() {
        assert!(validate_credentials("  ", "pw").is_err());
        assert!(validate_credentials("ops", "").is_err());
        assert_eq!(validate_credentials(" ops ", "pw").unwrap(), "ops");
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            username: "ops".to_string(),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
