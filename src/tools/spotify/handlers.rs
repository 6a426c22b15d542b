//! Spotify tool handlers
//!
//! Handlers never fail: provider errors become a `failed` report.

use serde_json::{json, Value};
use crate::spotify::{ApiError, SpotifyApi};
use super::command::{SpotifyCommand, TRACK_URI_PREFIX};
use super::report::Report;

pub async fn run(api: &dyn SpotifyApi, command: SpotifyCommand) -> Report {
    match command {
        SpotifyCommand::Me => match api.me().await {
            Ok(user) => Report {
                user: Some(user),
                ..Report::read("ok")
            },
            Err(e) => Report::read("ok").failed(e),
        },

        SpotifyCommand::CurrentPlayback => match api.currently_playing().await {
            Ok(info) => Report {
                info: Some(info.unwrap_or(Value::Null)),
                ..Report::read("ok")
            },
            Err(e) => Report::read("ok").failed(e),
        },

        SpotifyCommand::Pause { device_id } => {
            let result = api.pause(device_id.as_deref()).await;
            finish(Report { device_id, ..Report::action("paused") }, result)
        }

        SpotifyCommand::SkipNext { device_id } => {
            let result = api.skip_next(device_id.as_deref()).await;
            finish(
                Report {
                    direction: Some("next"),
                    device_id,
                    ..Report::action("skipped")
                },
                result,
            )
        }

        SpotifyCommand::SkipPrevious { device_id } => {
            let result = api.skip_previous(device_id.as_deref()).await;
            finish(
                Report {
                    direction: Some("previous"),
                    device_id,
                    ..Report::action("skipped")
                },
                result,
            )
        }

        SpotifyCommand::Resume { device_id } => {
            let result = api.play(device_id.as_deref(), None).await;
            finish(Report { device_id, ..Report::action("playing") }, result)
        }

        SpotifyCommand::SearchTracks { query } => match api.search_tracks(&query).await {
            Ok(results) => Report {
                query: Some(query),
                results: Some(results),
                ..Report::read("ok")
            },
            Err(e) => Report { query: Some(query), ..Report::read("ok") }.failed(e),
        },

        SpotifyCommand::PlayByQuery { query, device_id } => play_by_query(api, query, device_id).await,

        SpotifyCommand::Recommendations(params) => match api.recommendations(&params).await {
            Ok(body) => Report {
                recommendations: body.get("tracks").cloned(),
                seeds: body.get("seeds").cloned(),
                ..Report::read("ok")
            },
            Err(e) => Report::read("ok").failed(e),
        },

        SpotifyCommand::CreatePlaylist(playlist) => match api.create_playlist(&playlist).await {
            Ok(body) => Report {
                playlist: Some(json!({
                    "id": body.get("id"),
                    "name": body.get("name"),
                    "description": body.get("description"),
                    "public": body.get("public"),
                    "external_urls": body.get("external_urls"),
                    "uri": body.get("uri"),
                })),
                ..Report::action("created")
            },
            Err(e) => Report::action("created").failed(e),
        },

        SpotifyCommand::AddTracksToPlaylist { playlist_id, uris } => {
            match api.add_tracks_to_playlist(&playlist_id, &uris).await {
                Ok(body) => Report {
                    playlist_id: Some(playlist_id),
                    tracks_added: Some(uris.len()),
                    snapshot_id: body.get("snapshot_id").cloned(),
                    ..Report::action("added")
                },
                Err(e) => Report {
                    playlist_id: Some(playlist_id),
                    ..Report::action("added")
                }
                .failed(e),
            }
        }
    }
}

async fn play_by_query(api: &dyn SpotifyApi, query: String, device_id: Option<String>) -> Report {
    let base = |status| Report {
        query: Some(query.clone()),
        device_id: device_id.clone(),
        ..Report::action(status)
    };

    let body = match api.search_tracks(&query).await {
        Ok(body) => body,
        Err(e) => return base("playing").failed(e),
    };

    let Some(track) = body.pointer("/tracks/items/0").cloned() else {
        return Report {
            query: Some(query.clone()),
            device_id: device_id.clone(),
            ..Report::read("no_match")
        };
    };

    let uri = track
        .get("uri")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| track.get("id").and_then(Value::as_str).map(|id| format!("{}{}", TRACK_URI_PREFIX, id)));
    let Some(uri) = uri else {
        return base("playing").rejected("Matched track does not expose a URI.");
    };

    tracing::info!(%uri, "Starting playback of matched track");
    let uris = [uri];
    match api.play(device_id.as_deref(), Some(&uris[..])).await {
        Ok(()) => Report {
            matched_track: Some(track),
            ..base("playing")
        },
        Err(e) => base("playing").failed(e),
    }
}

fn finish(report: Report, result: Result<(), ApiError>) -> Report {
    match result {
        Ok(()) => report,
        Err(e) => report.failed(e),
    }
}
