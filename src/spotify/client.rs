//! Authenticated Spotify Web API client
//!
//! Resolves an access token lazily before each request, in this order:
//! interactive flow (when attached), cached token, stored access token,
//! one refresh grant, app-only client credentials.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use crate::Result;
use crate::auth::{AuthorizationFlow, CredentialStore, TokenGrants};
use super::api::{NewPlaylist, RecommendationParams, SpotifyApi};
use super::error::{ApiError, ApiResult};

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct TokenCache {
    current: Option<String>,
    /// Last token the Web API answered 401 for
    rejected: Option<String>,
}

/// Spotify Web API client with lazy authentication
pub struct SpotifyClient {
    http_client: Client,
    api_base: String,
    grants: Arc<dyn TokenGrants>,
    store: Arc<CredentialStore>,
    flow: Option<Arc<AuthorizationFlow>>,
    cache: Mutex<TokenCache>,
}

impl SpotifyClient {
    pub fn new(grants: Arc<dyn TokenGrants>, store: Arc<CredentialStore>) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            api_base: SPOTIFY_API_BASE.to_string(),
            grants,
            store,
            flow: None,
            cache: Mutex::new(TokenCache::default()),
        }
    }

    /// Run the interactive flow on first use when no user tokens are stored
    pub fn with_flow(mut self, flow: Arc<AuthorizationFlow>) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve an access token. Safe to call before every action.
    pub async fn authenticate(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(flow) = &self.flow {
            flow.ensure_tokens().await?;
        }

        if let Some(token) = &cache.current {
            return Ok(token.clone());
        }

        let stored = self.store.read();

        if let Some(access) = stored.access_token.filter(|t| cache.rejected.as_ref() != Some(t)) {
            tracing::debug!("Using stored Spotify access token");
            cache.current = Some(access.clone());
            return Ok(access);
        }

        if let Some(refresh) = stored.refresh_token {
            tracing::info!("Refreshing Spotify access token");
            let tokens = self.grants.refresh(&refresh).await?;
            self.store.write(&tokens)?;
            cache.current = Some(tokens.access_token.clone());
            return Ok(tokens.access_token);
        }

        tracing::info!("No user tokens stored, using app-only client credentials");
        let tokens = self.grants.client_credentials().await?;
        cache.current = Some(tokens.access_token.clone());
        Ok(tokens.access_token)
    }

    /// Forget `token` so the next request re-runs the policy
    async fn invalidate(&self, token: &str) {
        let mut cache = self.cache.lock().await;
        if cache.current.as_deref() == Some(token) {
            cache.current = None;
        }
        cache.rejected = Some(token.to_string());
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> ApiResult<Option<Value>> {
        let token = self.authenticate().await?;
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(%method, %url, "Spotify request");

        let mut request = self.http_client
            .request(method.clone(), &url)
            .bearer_auth(&token)
            .query(query);

        request = match body {
            Some(body) => request.json(&body),
            None if method != Method::GET => request.header(reqwest::header::CONTENT_LENGTH, "0"),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Spotify rejected the access token");
            self.invalidate(&token).await;
        }

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&text).unwrap_or(Value::String(text))))
    }

    async fn get(&self, path: &str, query: &[(String, String)]) -> ApiResult<Value> {
        self.send(Method::GET, path, query, None)
            .await?
            .ok_or_else(|| ApiError::system(format!("Empty response from {}", path)))
    }
}

fn device_query(device_id: Option<&str>) -> Vec<(String, String)> {
    device_id
        .map(|id| vec![("device_id".to_string(), id.to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn me(&self) -> ApiResult<Value> {
        self.get("/me", &[]).await
    }

    async fn currently_playing(&self) -> ApiResult<Option<Value>> {
        self.send(Method::GET, "/me/player/currently-playing", &[], None).await
    }

    async fn pause(&self, device_id: Option<&str>) -> ApiResult<()> {
        self.send(Method::PUT, "/me/player/pause", &device_query(device_id), None).await?;
        Ok(())
    }

    async fn skip_next(&self, device_id: Option<&str>) -> ApiResult<()> {
        self.send(Method::POST, "/me/player/next", &device_query(device_id), None).await?;
        Ok(())
    }

    async fn skip_previous(&self, device_id: Option<&str>) -> ApiResult<()> {
        self.send(Method::POST, "/me/player/previous", &device_query(device_id), None).await?;
        Ok(())
    }

    async fn play(&self, device_id: Option<&str>, uris: Option<&[String]>) -> ApiResult<()> {
        let body = uris.map(|uris| json!({ "uris": uris }));
        self.send(Method::PUT, "/me/player/play", &device_query(device_id), body).await?;
        Ok(())
    }

    async fn search_tracks(&self, query: &str) -> ApiResult<Value> {
        let params = [
            ("q".to_string(), query.to_string()),
            ("type".to_string(), "track".to_string()),
        ];
        self.get("/search", &params).await
    }

    async fn recommendations(&self, params: &RecommendationParams) -> ApiResult<Value> {
        self.get("/recommendations", &params.query_pairs()).await
    }

    async fn create_playlist(&self, playlist: &NewPlaylist) -> ApiResult<Value> {
        let body = serde_json::to_value(playlist).map_err(|e| ApiError::system(e.to_string()))?;
        self.send(Method::POST, "/me/playlists", &[], Some(body))
            .await?
            .ok_or_else(|| ApiError::system("Empty response from /me/playlists"))
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> ApiResult<Value> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        self.send(Method::POST, &path, &[], Some(json!({ "uris": uris })))
            .await?
            .ok_or_else(|| ApiError::system(format!("Empty response from {}", path)))
    }
}
