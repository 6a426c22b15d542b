//! spotify-tools - drive a Spotify account from an LLM agent
//!
//! This library provides the OAuth credential flow, the Spotify Web API
//! client, the tool registry and the agent loop that ties them together.

pub mod agent;
pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod spotify;
pub mod tools;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
