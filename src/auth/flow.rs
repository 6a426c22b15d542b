//! Interactive authorization-code flow
//!
//! Manages the browser-based OAuth2 exchange:
//! - loopback-only redirect validation
//! - CSRF state generation and authorize URL construction
//! - a one-shot callback listener that exchanges and persists the tokens

use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};
use crate::Result;
use crate::error::Error;
use crate::ui;
use super::callback_server::CallbackServer;
use super::credentials::CredentialStore;
use super::grants::{TokenGrants, SPOTIFY_AUTHORIZE_URL};

/// Scopes required for playback control and playlist management
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "playlist-modify-public",
    "playlist-modify-private",
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One pending interactive authorization
#[derive(Debug, Clone)]
pub struct AuthorizationSession {
    pub csrf_state: String,
    pub redirect_url: Url,
    pub authorize_url: Url,
}

/// Presents the authorize URL to the user
pub type BrowserLauncher = Arc<dyn Fn(&AuthorizationSession) + Send + Sync>;

/// Browser-based authorization for a Spotify user
pub struct AuthorizationFlow {
    client_id: String,
    redirect_uri: String,
    grants: Arc<dyn TokenGrants>,
    store: Arc<CredentialStore>,
    timeout: Duration,
    launcher: BrowserLauncher,
}

impl AuthorizationFlow {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        grants: Arc<dyn TokenGrants>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            grants,
            store,
            timeout: DEFAULT_TIMEOUT,
            launcher: Arc::new(open_in_browser),
        }
    }

    /// Bound the wait for the browser redirect
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace how the authorize URL is shown to the user
    pub fn with_launcher(mut self, launcher: BrowserLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Make sure user tokens exist, running the interactive flow only when
    /// neither an access token nor a refresh token is stored.
    pub async fn ensure_tokens(&self) -> Result<()> {
        if self.store.has_tokens() {
            tracing::debug!("Spotify tokens present, skipping interactive authorization");
            return Ok(());
        }

        tracing::info!("No Spotify tokens found, starting interactive authorization");
        self.authorize().await
    }

    /// Run the interactive flow unconditionally
    pub async fn authorize(&self) -> Result<()> {
        let session = self.session()?;

        let server = CallbackServer::bind(&session.redirect_url).await?;
        let pending = server.spawn(session.csrf_state.clone(), self.grants.clone(), self.store.clone());

        (self.launcher)(&session);

        pending.wait(self.timeout).await?;
        tracing::info!("Spotify authorization completed");
        Ok(())
    }

    /// Validate the redirect and build a fresh authorization session
    pub fn session(&self) -> Result<AuthorizationSession> {
        let redirect_url = validate_redirect(&self.redirect_uri)?;
        let csrf_state = generate_state();
        let authorize_url = build_authorize_url(&self.client_id, &redirect_url, &csrf_state, DEFAULT_SCOPES)?;

        Ok(AuthorizationSession {
            csrf_state,
            redirect_url,
            authorize_url,
        })
    }
}

/// Parse the redirect URI and require a loopback host
pub fn validate_redirect(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid redirect URI '{}': {}", raw, e)))?;

    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip == std::net::Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(ip)) => ip == std::net::Ipv6Addr::LOCALHOST,
        None => false,
    };

    if !loopback {
        return Err(Error::Config(
            "Interactive Spotify auth requires a localhost redirect URI".to_string(),
        ));
    }
    Ok(url)
}

/// Build the authorization URL
pub fn build_authorize_url(client_id: &str, redirect: &Url, state: &str, scopes: &[&str]) -> Result<Url> {
    let mut url = Url::parse(SPOTIFY_AUTHORIZE_URL)?;

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect.as_str())
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state)
        .append_pair("show_dialog", "true");

    Ok(url)
}

/// Generate a random hex state string for CSRF protection
pub fn generate_state() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn open_in_browser(session: &AuthorizationSession) {
    ui::print_step("Opening browser for Spotify authorization...");
    println!("\n  If the browser doesn't open, visit this URL:\n  {}\n", session.authorize_url);

    if let Err(e) = open::that_detached(session.authorize_url.as_str()) {
        tracing::warn!("Failed to open browser: {}", e);
    }

    ui::print_thinking("Waiting for authorization");
}
