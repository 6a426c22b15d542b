//! Spotify Web API access
//!
//! [`SpotifyApi`] is what the tools program against; [`SpotifyClient`] is the
//! real implementation backed by the accounts service and the credential store.

mod api;
mod client;
mod error;

pub use api::{NewPlaylist, RecommendationParams, SpotifyApi};
pub use client::{SpotifyClient, SPOTIFY_API_BASE};
pub use error::{ApiError, ApiResult};
