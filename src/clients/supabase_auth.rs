use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::domain::UserId;

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session is missing, expired or revoked")]
    Unauthorized,

    #[error("Auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Auth service error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid auth URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at - EXPIRY_SKEW_SECONDS <= Utc::now().timestamp()
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + token.expires_in.unwrap_or(3600));
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Client for the hosted backend's auth endpoints (`/auth/v1`).
#[derive(Debug, Clone)]
pub struct SupabaseAuthClient {
    client: Client,
    auth_url: Url,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(
        client: Client,
        project_url: &str,
        anon_key: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let mut base = Url::parse(project_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            auth_url: base.join("auth/v1/")?,
            anon_key: anon_key.into(),
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.auth_url.join(path)?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let url = self.endpoint("token?grant_type=password")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidCredentials);
        }

        let token: TokenResponse = Self::parse(response).await?;
        info!(user_id = %token.user.id, "Signed in");
        Ok(token.into())
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let url = self.endpoint("token?grant_type=refresh_token")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            return Err(AuthError::Unauthorized);
        }

        let token: TokenResponse = Self::parse(response).await?;
        debug!(user_id = %token.user.id, "Session refreshed");
        Ok(token.into())
    }

    /// Resolves the user behind an access token; rejects revoked tokens.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(AuthError::Unauthorized);
        }

        Self::parse(response).await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-revoked token is as signed out as it gets.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::remote_error(response).await)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        if !response.status().is_success() {
            return Err(Self::remote_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn remote_error(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error_description.or(b.msg).or(b.message))
            .unwrap_or(body);
        AuthError::Remote { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_live_under_auth_v1() {
        let client =
            SupabaseAuthClient::new(Client::new(), "https://demo.supabase.co", "anon").unwrap();
        assert_eq!(
            client.endpoint("token?grant_type=password").unwrap().as_str(),
            "https://demo.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn token_response_without_expires_at_uses_expires_in() {
        let json = r#"{
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": { "id": "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f", "email": "a@b.c" }
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let session = AuthSession::from(token);
        assert!(!session.is_expired());
        assert!(session.expires_at > Utc::now().timestamp() + 3000);
    }

    #[test]
    fn session_inside_skew_counts_as_expired() {
        let session = AuthSession {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now().timestamp() + 30,
            user: AuthUser {
                id: "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f".parse().unwrap(),
                email: None,
            },
        };
        assert!(session.is_expired());
    }
}
