//! Spotify Web API surface used by the tools.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use super::error::ApiResult;

/// Seeds and tunable attributes for `GET /recommendations`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationParams {
    pub seed_genres: Vec<String>,
    pub seed_tracks: Vec<String>,
    pub seed_artists: Vec<String>,
    pub target_valence: Option<f64>,
    pub target_energy: Option<f64>,
    pub target_danceability: Option<f64>,
    pub target_acousticness: Option<f64>,
    pub target_instrumentalness: Option<f64>,
    pub target_tempo: Option<f64>,
    pub limit: Option<u32>,
}

impl RecommendationParams {
    pub fn has_seed(&self) -> bool {
        !(self.seed_genres.is_empty() && self.seed_tracks.is_empty() && self.seed_artists.is_empty())
    }

    /// Query string pairs; seeds are comma separated, unset targets are left out
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        for (key, seeds) in [
            ("seed_genres", &self.seed_genres),
            ("seed_tracks", &self.seed_tracks),
            ("seed_artists", &self.seed_artists),
        ] {
            if !seeds.is_empty() {
                pairs.push((key.to_string(), seeds.join(",")));
            }
        }

        for (key, target) in [
            ("target_valence", self.target_valence),
            ("target_energy", self.target_energy),
            ("target_danceability", self.target_danceability),
            ("target_acousticness", self.target_acousticness),
            ("target_instrumentalness", self.target_instrumentalness),
            ("target_tempo", self.target_tempo),
        ] {
            if let Some(value) = target {
                pairs.push((key.to_string(), value.to_string()));
            }
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Body for `POST /me/playlists`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPlaylist {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub public: bool,
}

/// The Spotify actions the tools can perform. Every call authenticates lazily.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Profile of the current user
    async fn me(&self) -> ApiResult<Value>;

    /// Track currently playing, `None` when nothing is playing
    async fn currently_playing(&self) -> ApiResult<Option<Value>>;

    async fn pause(&self, device_id: Option<&str>) -> ApiResult<()>;

    async fn skip_next(&self, device_id: Option<&str>) -> ApiResult<()>;

    async fn skip_previous(&self, device_id: Option<&str>) -> ApiResult<()>;

    /// Resume playback, or start the given track URIs
    async fn play(&self, device_id: Option<&str>, uris: Option<&[String]>) -> ApiResult<()>;

    /// Raw `GET /search?type=track` response
    async fn search_tracks(&self, query: &str) -> ApiResult<Value>;

    async fn recommendations(&self, params: &RecommendationParams) -> ApiResult<Value>;

    async fn create_playlist(&self, playlist: &NewPlaylist) -> ApiResult<Value>;

    /// Returns the response carrying `snapshot_id`
    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> ApiResult<Value>;
}
