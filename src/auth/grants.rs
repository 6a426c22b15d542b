//! Spotify accounts service token grants
//!
//! The three OAuth2 grants the crate relies on: authorization code,
//! refresh token and client credentials. [`TokenGrants`] is the seam used by
//! the callback server and the Spotify client so both can run against fakes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::Result;
use crate::error::Error;
use super::credentials::TokenSet;

/// Spotify OAuth2 endpoints
pub const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Application identity registered with Spotify
#[derive(Clone)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Token endpoint operations
#[async_trait]
pub trait TokenGrants: Send + Sync {
    /// Exchange an authorization code captured from the redirect
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet>;

    /// Obtain a new access token from a refresh token
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;

    /// App-only token with no user context
    async fn client_credentials(&self) -> Result<TokenSet>;
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// HTTP client for the Spotify accounts service
#[derive(Clone)]
pub struct AccountsClient {
    app: AppCredentials,
    token_url: String,
    http_client: Client,
}

impl AccountsClient {
    pub fn new(app: AppCredentials) -> Self {
        Self {
            app,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Point the client at a different token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    async fn request_token(&self, form: &[(&str, &str)], grant: &str) -> Result<TokenResponse> {
        tracing::debug!(grant, "Requesting token");

        let response = self.http_client
            .post(&self.token_url)
            .basic_auth(&self.app.client_id, Some(&self.app.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{} request failed: {}", grant, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("{} failed ({}): {}", grant, status, error_text)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenGrants for AccountsClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet> {
        let body = self
            .request_token(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                ],
                "Token exchange",
            )
            .await?;

        Ok(TokenSet::new(body.access_token, body.refresh_token, body.expires_in))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let body = self
            .request_token(
                &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
                "Token refresh",
            )
            .await?;

        // Preserve the refresh token if not returned in response
        let refresh = body.refresh_token.or_else(|| Some(refresh_token.to_string()));
        Ok(TokenSet::new(body.access_token, refresh, body.expires_in))
    }

    async fn client_credentials(&self) -> Result<TokenSet> {
        let body = self
            .request_token(&[("grant_type", "client_credentials")], "Client credentials grant")
            .await?;

        Ok(TokenSet::new(body.access_token, None, body.expires_in))
    }
}
