//! Spotify tools - playback, search, recommendations and playlists

mod command;
mod definitions;
mod handlers;
mod report;

pub use command::{ArgumentError, SpotifyCommand};
pub use definitions::Action;
pub use report::Report;

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use crate::Result;
use crate::spotify::SpotifyApi;
use super::{Tool, ToolModule};

/// One Spotify action exposed as a tool
pub struct SpotifyTool {
    action: Action,
    api: Arc<dyn SpotifyApi>,
}

impl SpotifyTool {
    pub fn new(action: Action, api: Arc<dyn SpotifyApi>) -> Self {
        Self { action, api }
    }
}

#[async_trait]
impl Tool for SpotifyTool {
    fn name(&self) -> &str { self.action.name() }
    fn description(&self) -> &str { self.action.description() }
    fn parameters(&self) -> Value { self.action.parameters() }

    async fn execute(&self, params: Value) -> Result<Value> {
        let report = match SpotifyCommand::parse(self.action, &params) {
            Ok(command) => handlers::run(self.api.as_ref(), command).await,
            Err(e) => {
                tracing::debug!(tool = self.action.name(), "Rejected arguments: {}", e);
                Report::action("failed").rejected(e.to_string())
            }
        };
        Ok(report.into_value())
    }
}

/// All Spotify tools, in advertised order
pub fn module(api: Arc<dyn SpotifyApi>) -> ToolModule {
    Action::ALL
        .into_iter()
        .fold(ToolModule::new("spotify"), |module, action| {
            module.with_tool(SpotifyTool::new(action, api.clone()))
        })
}

/// Recording in-memory Spotify
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;
    use serde_json::{json, Value};
    use crate::spotify::{ApiError, ApiResult, NewPlaylist, RecommendationParams, SpotifyApi};
    use super::*;

    #[derive(Default)]
    pub struct FakeSpotify {
        pub calls: Mutex<Vec<String>>,
        pub search_items: Vec<Value>,
        pub fail_with: Option<ApiError>,
    }

    impl FakeSpotify {
        pub fn with_tracks(items: Vec<Value>) -> Self {
            Self {
                search_items: items,
                ..Self::default()
            }
        }

        pub fn failing(err: ApiError) -> Self {
            Self {
                fail_with: Some(err),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> ApiResult<()> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl SpotifyApi for FakeSpotify {
        async fn me(&self) -> ApiResult<Value> {
            self.record("me".to_string())?;
            Ok(json!({"id": "listener", "display_name": "Listener"}))
        }

        async fn currently_playing(&self) -> ApiResult<Option<Value>> {
            self.record("currently_playing".to_string())?;
            Ok(None)
        }

        async fn pause(&self, device_id: Option<&str>) -> ApiResult<()> {
            self.record(format!("pause {:?}", device_id))
        }

        async fn skip_next(&self, device_id: Option<&str>) -> ApiResult<()> {
            self.record(format!("next {:?}", device_id))
        }

        async fn skip_previous(&self, device_id: Option<&str>) -> ApiResult<()> {
            self.record(format!("previous {:?}", device_id))
        }

        async fn play(&self, device_id: Option<&str>, uris: Option<&[String]>) -> ApiResult<()> {
            self.record(format!("play {:?} {:?}", device_id, uris))
        }

        async fn search_tracks(&self, query: &str) -> ApiResult<Value> {
            self.record(format!("search {}", query))?;
            Ok(json!({"tracks": {"items": self.search_items}}))
        }

        async fn recommendations(&self, params: &RecommendationParams) -> ApiResult<Value> {
            self.record(format!("recommendations {:?}", params.seed_genres))?;
            Ok(json!({"tracks": [{"uri": "spotify:track:rec"}], "seeds": [{"id": "lo-fi", "type": "GENRE"}]}))
        }

        async fn create_playlist(&self, playlist: &NewPlaylist) -> ApiResult<Value> {
            self.record(format!("create {} public={}", playlist.name, playlist.public))?;
            Ok(json!({
                "id": "pl1",
                "name": playlist.name,
                "description": playlist.description,
                "public": playlist.public,
                "uri": "spotify:playlist:pl1",
                "owner": {"id": "listener"}
            }))
        }

        async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> ApiResult<Value> {
            self.record(format!("add {} {:?}", playlist_id, uris))?;
            Ok(json!({"snapshot_id": "snap-1"}))
        }
    }
}
