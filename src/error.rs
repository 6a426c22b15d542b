//! Error types for spotify-tools

use thiserror::Error;

/// Result type alias for spotify-tools operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spotify-tools
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("No handler registered for tool {0}")]
    UnknownTool(String),

    #[error("Duplicate handler registered for tool {0}")]
    DuplicateTool(String),

    #[error("Max iterations reached ({0})")]
    MaxIterations(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}
