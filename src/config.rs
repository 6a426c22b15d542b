//! Configuration management
//!
//! Settings are layered: built-in defaults, then `~/.spotify-tools/config.json`
//! when present, then environment variables. The binary applies CLI flags last.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use crate::Result;
use crate::error::Error;

pub const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "SPOTIFY_REDIRECT_URI";
pub const ENV_ACCESS_TOKEN: &str = "SPOTIFY_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";
pub const ENV_CREDENTIALS_FILE: &str = "SPOTIFY_CREDENTIALS_FILE";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OLLAMA_API_KEY: &str = "OLLAMA_API_KEY";
pub const ENV_MODEL: &str = "SPOTIFY_TOOLS_MODEL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Spotify application settings
    #[serde(default)]
    pub spotify: SpotifyConfig,

    /// Chat model host settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum model round-trips per prompt
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// System instruction seeded into every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,
}

/// Spotify application credentials and OAuth settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Durable `KEY=VALUE` file that receives the user tokens
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// How long the interactive flow waits for the browser redirect
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,

    /// Token seeded from the environment, never written to config.json
    #[serde(skip)]
    pub access_token: Option<String>,

    #[serde(skip)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-oss:120b".to_string()
}

fn default_max_iterations() -> usize {
    20
}

fn default_system_prompt() -> Option<String> {
    Some(
        "You are an assistant that controls the user Spotify account via the provided tools. \
         Every answer must be about Spotify playback or account actions, and you should prefer \
         calling tools whenever they can help."
            .to_string(),
    )
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/callback".to_string()
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(".env.local")
}

fn default_auth_timeout_secs() -> u64 {
    300
}

fn default_ollama_host() -> String {
    crate::agent::DEFAULT_OLLAMA_HOST.to_string()
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            credentials_file: default_credentials_file(),
            auth_timeout_secs: default_auth_timeout_secs(),
            access_token: None,
            refresh_token: None,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            api_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spotify: SpotifyConfig::default(),
            ollama: OllamaConfig::default(),
            model: default_model(),
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Config {
    /// Overlay values found by `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CLIENT_ID) {
            self.spotify.client_id = v;
        }
        if let Some(v) = get(ENV_CLIENT_SECRET) {
            self.spotify.client_secret = v;
        }
        if let Some(v) = get(ENV_REDIRECT_URI) {
            self.spotify.redirect_uri = v;
        }
        if let Some(v) = get(ENV_CREDENTIALS_FILE) {
            self.spotify.credentials_file = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_OLLAMA_HOST) {
            self.ollama.host = v;
        }
        if let Some(v) = get(ENV_MODEL) {
            self.model = v;
        }
        self.spotify.access_token = get(ENV_ACCESS_TOKEN).or(self.spotify.access_token.take());
        self.spotify.refresh_token = get(ENV_REFRESH_TOKEN).or(self.spotify.refresh_token.take());
        self.ollama.api_key = get(ENV_OLLAMA_API_KEY).or(self.ollama.api_key.take());
    }

    /// Application client identifier, required for every grant
    pub fn client_id(&self) -> Result<&str> {
        require(&self.spotify.client_id, ENV_CLIENT_ID)
    }

    /// Application client secret, required for every grant
    pub fn client_secret(&self) -> Result<&str> {
        require(&self.spotify.client_secret, ENV_CLIENT_SECRET)
    }

    /// Parsed redirect URI
    pub fn redirect_url(&self) -> Result<Url> {
        Url::parse(&self.spotify.redirect_uri).map_err(|e| {
            Error::Config(format!(
                "Invalid {} '{}': {}",
                ENV_REDIRECT_URI, self.spotify.redirect_uri, e
            ))
        })
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.spotify.auth_timeout_secs)
    }
}

fn require<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!(
            "Missing required environment variable {}. Add it to your shell or ~/.spotify-tools/config.json.",
            name
        )));
    }
    Ok(value)
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".spotify-tools")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the optional file and the process environment
pub fn load() -> Result<Config> {
    let path = config_path();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)?
    } else {
        Config::default()
    };

    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}
