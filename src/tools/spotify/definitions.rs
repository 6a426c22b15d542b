//! Names, descriptions and parameter schemas of the Spotify tools

use serde_json::{json, Value};

/// One advertised Spotify tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Me,
    CurrentPlayback,
    Pause,
    SkipNext,
    SkipPrevious,
    Resume,
    SearchTracks,
    PlayByQuery,
    Recommendations,
    CreatePlaylist,
    AddTracksToPlaylist,
}

impl Action {
    /// Every tool, in the order it is advertised
    pub const ALL: [Action; 11] = [
        Action::Me,
        Action::CurrentPlayback,
        Action::Pause,
        Action::SkipNext,
        Action::SkipPrevious,
        Action::Resume,
        Action::SearchTracks,
        Action::PlayByQuery,
        Action::Recommendations,
        Action::CreatePlaylist,
        Action::AddTracksToPlaylist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Me => "get_spotify_me",
            Action::CurrentPlayback => "get_spotify_current_playback",
            Action::Pause => "pause_spotify_playback",
            Action::SkipNext => "skip_spotify_next",
            Action::SkipPrevious => "skip_spotify_previous",
            Action::Resume => "resume_spotify_playback",
            Action::SearchTracks => "search_spotify_tracks",
            Action::PlayByQuery => "play_spotify_track_by_query",
            Action::Recommendations => "get_spotify_recommendations",
            Action::CreatePlaylist => "create_spotify_playlist",
            Action::AddTracksToPlaylist => "add_tracks_to_playlist",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::Me => "Fetch profile information about the currently authenticated Spotify user",
            Action::CurrentPlayback => "Retrieve information about the track currently playing for the user, if any",
            Action::Pause => "Pause the current Spotify playback for the authenticated user",
            Action::SkipNext => "Skip the user's current Spotify playback to the next track",
            Action::SkipPrevious => "Skip the user's current Spotify playback to the previous track",
            Action::Resume => "Start or resume the user's Spotify playback",
            Action::SearchTracks => {
                "Search Spotify tracks matching a free-text query or advanced field filters (e.g., artist:Love track:Alright)"
            }
            Action::PlayByQuery => {
                "Search Spotify for the best-matching track and immediately start playback with that track on the chosen device."
            }
            Action::Recommendations => {
                "Get track recommendations based on seed genres, artists or tracks and tunable audio features. \
                 Use this to discover music matching a mood or vibe. At least one seed must be provided."
            }
            Action::CreatePlaylist => {
                "Create a new Spotify playlist for the authenticated user. Returns the playlist ID which can be used to add tracks."
            }
            Action::AddTracksToPlaylist => {
                "Add one or more tracks to an existing Spotify playlist. Track URIs must be in the format \"spotify:track:xxxxx\"."
            }
        }
    }

    pub fn parameters(self) -> Value {
        match self {
            Action::Me | Action::CurrentPlayback => object(json!({}), &[]),
            Action::Pause => object(json!({ "deviceId": device_id("pauses") }), &[]),
            Action::SkipNext | Action::SkipPrevious => object(json!({ "deviceId": device_id("skips on") }), &[]),
            Action::Resume => object(json!({ "deviceId": device_id("resumes") }), &[]),
            Action::SearchTracks => object(
                json!({
                    "query": {
                        "type": "string",
                        "description": "Search expression that follows the Spotify Search API syntax. Required."
                    }
                }),
                &["query"],
            ),
            Action::PlayByQuery => object(
                json!({
                    "query": {
                        "type": "string",
                        "description": "User utterance describing what to play (song name, artist, etc.). Required."
                    },
                    "deviceId": {
                        "type": "string",
                        "description": "Optional Spotify device ID to target. Defaults to the actively playing device."
                    }
                }),
                &["query"],
            ),
            Action::Recommendations => object(
                json!({
                    "seed_genres": string_list("Genre seeds (e.g., [\"lo-fi\", \"chill\", \"indie\"])."),
                    "seed_tracks": string_list("Spotify track IDs to use as seeds."),
                    "seed_artists": string_list("Spotify artist IDs to use as seeds."),
                    "target_valence": number("Target valence (0.0-1.0). Low values = sad/melancholic, high values = happy/cheerful."),
                    "target_energy": number("Target energy level (0.0-1.0). Low = calm/relaxed, high = intense/energetic."),
                    "target_danceability": number("Target danceability (0.0-1.0). How suitable the track is for dancing."),
                    "target_acousticness": number("Target acousticness (0.0-1.0). Confidence that the track is acoustic."),
                    "target_instrumentalness": number("Target instrumentalness (0.0-1.0). Predicts whether a track contains no vocals."),
                    "target_tempo": number("Target tempo in BPM (beats per minute)."),
                    "limit": number("Maximum number of recommendations to return (1-100). Default is 20.")
                }),
                &[],
            ),
            Action::CreatePlaylist => object(
                json!({
                    "name": { "type": "string", "description": "Name of the playlist. Required." },
                    "description": { "type": "string", "description": "Optional description for the playlist." },
                    "public": {
                        "type": "boolean",
                        "description": "Whether the playlist should be public. Default is false (private)."
                    }
                }),
                &["name"],
            ),
            Action::AddTracksToPlaylist => object(
                json!({
                    "playlistId": {
                        "type": "string",
                        "description": "Spotify playlist ID where tracks will be added. Required."
                    },
                    "trackUris": string_list(
                        "Spotify track URIs (e.g., [\"spotify:track:xxxxx\", \"spotify:track:yyyyy\"]). Required."
                    )
                }),
                &["playlistId", "trackUris"],
            ),
        }
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn device_id(verb: &str) -> Value {
    json!({
        "type": "string",
        "description": format!("Optional device ID. If omitted, Spotify {} the active device.", verb),
    })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn number(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = Action::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), Action::ALL.len());
    }

    #[test]
    fn test_schemas_are_objects() {
        for action in Action::ALL {
            let schema = action.parameters();
            assert_eq!(schema["type"], "object", "{}", action.name());
            assert!(schema["properties"].is_object());
            assert!(schema["required"].is_array());
        }
        assert_eq!(Action::PlayByQuery.parameters()["required"], json!(["query"]));
    }
}
