//! Authentication module for Spotify OAuth2 and credential management
//!
//! This module provides:
//! - Credential storage in a `KEY=VALUE` file
//! - Token grants against the Spotify accounts service
//! - OAuth2 callback server
//! - The interactive authorization flow

mod callback_server;
mod credentials;
mod flow;
mod grants;

pub use callback_server::{CallbackServer, PendingCallback};
pub use credentials::{CredentialStore, StoredTokens, TokenSet};
pub use flow::{
    build_authorize_url, generate_state, validate_redirect, AuthorizationFlow, AuthorizationSession,
    BrowserLauncher, DEFAULT_SCOPES,
};
pub use grants::{AccountsClient, AppCredentials, TokenGrants, SPOTIFY_AUTHORIZE_URL, SPOTIFY_TOKEN_URL};

#[cfg(test)]
pub(crate) use grants::fake;
