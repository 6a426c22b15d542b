//! Typed arguments for the Spotify tools
//!
//! Model-supplied arguments are loosely typed JSON. They are checked once here
//! and anything malformed is rejected before Spotify is contacted.

use serde_json::Value;
use thiserror::Error;
use crate::spotify::{NewPlaylist, RecommendationParams};
use super::definitions::Action;

pub const TRACK_URI_PREFIX: &str = "spotify:track:";

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum SpotifyCommand {
    Me,
    CurrentPlayback,
    Pause { device_id: Option<String> },
    SkipNext { device_id: Option<String> },
    SkipPrevious { device_id: Option<String> },
    Resume { device_id: Option<String> },
    SearchTracks { query: String },
    PlayByQuery { query: String, device_id: Option<String> },
    Recommendations(RecommendationParams),
    CreatePlaylist(NewPlaylist),
    AddTracksToPlaylist { playlist_id: String, uris: Vec<String> },
}

impl SpotifyCommand {
    pub fn parse(action: Action, args: &Value) -> Result<Self, ArgumentError> {
        let command = match action {
            Action::Me => SpotifyCommand::Me,
            Action::CurrentPlayback => SpotifyCommand::CurrentPlayback,
            Action::Pause => SpotifyCommand::Pause { device_id: optional_string(args, "deviceId") },
            Action::SkipNext => SpotifyCommand::SkipNext { device_id: optional_string(args, "deviceId") },
            Action::SkipPrevious => SpotifyCommand::SkipPrevious { device_id: optional_string(args, "deviceId") },
            Action::Resume => SpotifyCommand::Resume { device_id: optional_string(args, "deviceId") },
            Action::SearchTracks => SpotifyCommand::SearchTracks {
                query: required_string(args, "query")?,
            },
            Action::PlayByQuery => SpotifyCommand::PlayByQuery {
                query: required_string(args, "query")?,
                device_id: optional_string(args, "deviceId"),
            },
            Action::Recommendations => {
                let params = RecommendationParams {
                    seed_genres: string_list(args, "seed_genres"),
                    seed_tracks: string_list(args, "seed_tracks"),
                    seed_artists: string_list(args, "seed_artists"),
                    target_valence: number(args, "target_valence"),
                    target_energy: number(args, "target_energy"),
                    target_danceability: number(args, "target_danceability"),
                    target_acousticness: number(args, "target_acousticness"),
                    target_instrumentalness: number(args, "target_instrumentalness"),
                    target_tempo: number(args, "target_tempo"),
                    limit: number(args, "limit").map(|n| n.round().clamp(1.0, 100.0) as u32),
                };
                if !params.has_seed() {
                    return Err(ArgumentError(
                        "At least one seed (seed_genres, seed_tracks, or seed_artists) must be provided.".to_string(),
                    ));
                }
                SpotifyCommand::Recommendations(params)
            }
            Action::CreatePlaylist => SpotifyCommand::CreatePlaylist(NewPlaylist {
                name: required_string(args, "name")?,
                description: optional_string(args, "description"),
                public: args.get("public").and_then(Value::as_bool).unwrap_or(false),
            }),
            Action::AddTracksToPlaylist => {
                let playlist_id = required_string(args, "playlistId")?;

                let raw = args.get("trackUris").and_then(Value::as_array).filter(|a| !a.is_empty());
                let Some(raw) = raw else {
                    return Err(ArgumentError(
                        "The \"trackUris\" argument must be a non-empty array.".to_string(),
                    ));
                };

                let uris: Vec<String> = raw
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|uri| uri.starts_with(TRACK_URI_PREFIX))
                    .map(str::to_string)
                    .collect();
                if uris.is_empty() {
                    return Err(ArgumentError(format!(
                        "No valid Spotify track URIs found. URIs must start with \"{}\".",
                        TRACK_URI_PREFIX
                    )));
                }
                SpotifyCommand::AddTracksToPlaylist { playlist_id, uris }
            }
        };
        Ok(command)
    }
}

/// Non-string values are treated as absent
fn optional_string(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn required_string(args: &Value, key: &str) -> Result<String, ArgumentError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ArgumentError(format!("The \"{}\" argument must be a non-empty string.", key)))
}

fn string_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn number(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_id_must_be_a_string() {
        assert_eq!(
            SpotifyCommand::parse(Action::Pause, &json!({"deviceId": 42})).unwrap(),
            SpotifyCommand::Pause { device_id: None }
        );
        assert_eq!(
            SpotifyCommand::parse(Action::Pause, &json!({"deviceId": "kitchen"})).unwrap(),
            SpotifyCommand::Pause { device_id: Some("kitchen".to_string()) }
        );
        // Missing arguments object
        assert_eq!(
            SpotifyCommand::parse(Action::SkipNext, &Value::Null).unwrap(),
            SpotifyCommand::SkipNext { device_id: None }
        );
    }

    #[test]
    fn test_query_is_trimmed_and_required() {
        assert_eq!(
            SpotifyCommand::parse(Action::SearchTracks, &json!({"query": "  lofi beats "})).unwrap(),
            SpotifyCommand::SearchTracks { query: "lofi beats".to_string() }
        );

        for args in [json!({}), json!({"query": "   "}), json!({"query": 7})] {
            let err = SpotifyCommand::parse(Action::PlayByQuery, &args).unwrap_err();
            assert_eq!(err.to_string(), "The \"query\" argument must be a non-empty string.");
        }
    }

    #[test]
    fn test_recommendations_need_a_seed() {
        let err = SpotifyCommand::parse(Action::Recommendations, &json!({"target_energy": 0.9})).unwrap_err();
        assert!(err.to_string().starts_with("At least one seed"));

        let command = SpotifyCommand::parse(
            Action::Recommendations,
            &json!({"seed_artists": ["a1", 5], "limit": 250, "target_tempo": "fast"}),
        )
        .unwrap();
        let SpotifyCommand::Recommendations(params) = command else {
            panic!("expected recommendations");
        };
        assert_eq!(params.seed_artists, vec!["a1"]);
        assert_eq!(params.limit, Some(100));
        assert_eq!(params.target_tempo, None);
    }

    #[test]
    fn test_playlist_defaults_to_private() {
        let command = SpotifyCommand::parse(Action::CreatePlaylist, &json!({"name": " Focus "})).unwrap();
        assert_eq!(
            command,
            SpotifyCommand::CreatePlaylist(NewPlaylist {
                name: "Focus".to_string(),
                description: None,
                public: false,
            })
        );
    }

    #[test]
    fn test_only_track_uris_are_kept() {
        let command = SpotifyCommand::parse(
            Action::AddTracksToPlaylist,
            &json!({
                "playlistId": "pl1",
                "trackUris": ["spotify:track:a", "spotify:album:b", 3, "spotify:track:c"]
            }),
        )
        .unwrap();
        assert_eq!(
            command,
            SpotifyCommand::AddTracksToPlaylist {
                playlist_id: "pl1".to_string(),
                uris: vec!["spotify:track:a".to_string(), "spotify:track:c".to_string()],
            }
        );

        let err = SpotifyCommand::parse(
            Action::AddTracksToPlaylist,
            &json!({"playlistId": "pl1", "trackUris": ["spotify:episode:x"]}),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("No valid Spotify track URIs"));

        let err = SpotifyCommand::parse(Action::AddTracksToPlaylist, &json!({"playlistId": "pl1", "trackUris": []}))
            .unwrap_err();
        assert_eq!(err.to_string(), "The \"trackUris\" argument must be a non-empty array.");
    }
}
