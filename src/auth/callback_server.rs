//! OAuth2 callback server
//!
//! A temporary local HTTP server that captures the authorization code from the
//! browser redirect, exchanges it and persists the resulting tokens.
//!
//! The listener moves through `CallbackState`: `Listening -> Validating ->
//! Exchanging -> Completed`, or `Validating -> Failed`. The terminal outcome is
//! delivered once over a oneshot channel, and the socket is dropped with it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::{Host, Url};
use crate::Result;
use crate::error::Error;
use super::credentials::CredentialStore;
use super::grants::TokenGrants;

/// Success page shown after authorization
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>spotify-tools | Authorization complete</title>
    <style>
        body {
            background-color: #121212;
            color: #e2e8f0;
            font-family: -apple-system, system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        h1 { color: #1db954; font-size: 24px; margin: 0 0 12px; }
        p { color: #94a3b8; font-size: 15px; line-height: 1.6; }
    </style>
</head>
<body>
    <div>
        <h1>Spotify authorization complete</h1>
        <p>You can return to the terminal.</p>
    </div>
</body>
</html>"#;

/// How long a connection may stay silent before it is dropped
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackState {
    Listening,
    Validating,
    Exchanging,
    Completed,
    Failed,
}

/// What an inbound request means for the flow
#[derive(Debug, PartialEq, Eq)]
enum Callback {
    /// Not the redirect path; keep listening
    Ignored,
    /// Redirect path with a usable code
    Accepted { code: String },
    /// Redirect path but unusable; the flow fails with this reason
    Rejected { reason: String, body: &'static str },
}

/// Validate an HTTP request against the redirect URL and the expected state
fn parse_callback_request(request: &str, redirect: &Url, expected_state: &str) -> Callback {
    // GET /callback?code=xxx&state=yyy HTTP/1.1
    let target = match request.lines().next().and_then(|line| line.split_whitespace().nth(1)) {
        Some(target) => target,
        None => return Callback::Ignored,
    };

    let url = match redirect.join(target) {
        Ok(url) => url,
        Err(_) => return Callback::Ignored,
    };

    if url.path() != redirect.path() {
        return Callback::Ignored;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(err) = error {
        return Callback::Rejected {
            reason: format!("Authorization denied by Spotify: {}", err),
            body: "Authorization was denied. Please retry the authorization flow.",
        };
    }

    let (code, state) = match (code.filter(|c| !c.is_empty()), state.filter(|s| !s.is_empty())) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            return Callback::Rejected {
                reason: "Callback is missing code or state".to_string(),
                body: "Missing code or state",
            }
        }
    };

    if state != expected_state {
        return Callback::Rejected {
            reason: "State mismatch on authorization callback".to_string(),
            body: "State mismatch. Please retry the authorization flow.",
        };
    }

    Callback::Accepted { code }
}

/// Address to bind for a redirect URL
pub(crate) fn bind_address(redirect: &Url) -> Result<(String, u16)> {
    let host = match redirect.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(Error::Config(format!("Redirect URI {} has no host", redirect))),
    };
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| Error::Config(format!("Redirect URI {} has no port", redirect)))?;
    Ok((host, port))
}

/// A bound, not yet serving, callback listener
pub struct CallbackServer {
    listener: TcpListener,
    redirect: Url,
    read_timeout: Duration,
}

impl CallbackServer {
    /// Bind the listener on the redirect host and port
    pub async fn bind(redirect: &Url) -> Result<Self> {
        let (host, port) = bind_address(redirect)?;
        let listener = TcpListener::bind((host.as_str(), port)).await
            .map_err(|e| Error::Auth(format!("Failed to start callback server on {}:{}: {}", host, port, e)))?;

        tracing::info!("Callback server listening on {}", redirect);

        Ok(Self {
            listener,
            redirect: redirect.clone(),
            read_timeout: READ_TIMEOUT,
        })
    }

    #[cfg(test)]
    fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve in the background until a terminal state is reached
    pub fn spawn(
        self,
        expected_state: String,
        grants: Arc<dyn TokenGrants>,
        store: Arc<CredentialStore>,
    ) -> PendingCallback {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let outcome = self.serve(&expected_state, grants.as_ref(), &store).await;
            // Receiver gone means the caller timed out; nothing left to notify
            let _ = tx.send(outcome);
        });

        PendingCallback { outcome: rx, task }
    }

    async fn serve(self, expected_state: &str, grants: &dyn TokenGrants, store: &CredentialStore) -> Result<()> {
        let mut state = CallbackState::Listening;

        loop {
            let (mut socket, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    transition(&mut state, CallbackState::Failed);
                    return Err(Error::Auth(format!("Failed to accept connection: {}", e)));
                }
            };

            let mut buffer = vec![0u8; 4096];
            let n = match tokio::time::timeout(self.read_timeout, socket.read(&mut buffer)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    tracing::debug!(%peer, "Dropping unreadable connection: {}", e);
                    continue;
                }
                Err(_) => {
                    tracing::debug!(%peer, "Dropping idle connection");
                    continue;
                }
            };
            let request = String::from_utf8_lossy(&buffer[..n]);

            transition(&mut state, CallbackState::Validating);
            match parse_callback_request(&request, &self.redirect, expected_state) {
                Callback::Ignored => {
                    tracing::debug!(%peer, "Ignoring request outside the redirect path");
                    respond(&mut socket, "404 Not Found", "text/plain", "Not found").await;
                    transition(&mut state, CallbackState::Listening);
                }
                Callback::Rejected { reason, body } => {
                    respond(&mut socket, "400 Bad Request", "text/plain", body).await;
                    transition(&mut state, CallbackState::Failed);
                    return Err(Error::Auth(reason));
                }
                Callback::Accepted { code } => {
                    transition(&mut state, CallbackState::Exchanging);
                    let persisted = match grants.exchange_code(&code, self.redirect.as_str()).await {
                        Ok(tokens) => store.write(&tokens),
                        Err(e) => Err(e),
                    };

                    return match persisted {
                        Ok(()) => {
                            respond(&mut socket, "200 OK", "text/html", SUCCESS_HTML).await;
                            transition(&mut state, CallbackState::Completed);
                            Ok(())
                        }
                        Err(e) => {
                            respond(
                                &mut socket,
                                "500 Internal Server Error",
                                "text/plain",
                                "Failed to exchange code. Check terminal output for details.",
                            )
                            .await;
                            transition(&mut state, CallbackState::Failed);
                            Err(Error::Auth(format!("Failed to exchange authorization code: {}", e)))
                        }
                    };
                }
            }
        }
    }
}

fn transition(state: &mut CallbackState, next: CallbackState) {
    tracing::debug!(from = ?*state, to = ?next, "Callback state");
    *state = next;
}

async fn respond(socket: &mut TcpStream, status: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Handle to a serving listener
pub struct PendingCallback {
    outcome: oneshot::Receiver<Result<()>>,
    task: JoinHandle<()>,
}

impl PendingCallback {
    /// Wait for the terminal outcome, closing the listener if `timeout` elapses first
    pub async fn wait(self, timeout: Duration) -> Result<()> {
        let PendingCallback { outcome, task } = self;

        match tokio::time::timeout(timeout, outcome).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Auth("Callback listener stopped unexpectedly".to_string())),
            Err(_) => {
                task.abort();
                Err(Error::Auth(format!(
                    "Timed out after {}s waiting for the authorization redirect",
                    timeout.as_secs()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::StoredTokens;
    use crate::auth::grants::fake::FakeGrants;
    use tempfile::TempDir;

    const STATE: &str = "0123456789abcdef0123456789abcdef";

    fn redirect() -> Url {
        Url::parse("http://localhost:3000/callback").unwrap()
    }

    async fn start(grants: Arc<FakeGrants>) -> (String, PendingCallback, Arc<CredentialStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::open(dir.path().join(".env.local"), StoredTokens::default()).unwrap());

        let redirect = Url::parse("http://127.0.0.1:0/callback").unwrap();
        let server = CallbackServer::bind(&redirect).await.unwrap();
        let base = format!("http://{}", server.local_addr().unwrap());
        let pending = server.spawn(STATE.to_string(), grants, store.clone());
        (base, pending, store, dir)
    }

    #[test]
    fn test_parse_callback_success() {
        let request = format!("GET /callback?code=abc123&state={} HTTP/1.1\r\nHost: localhost\r\n\r\n", STATE);
        let result = parse_callback_request(&request, &redirect(), STATE);
        assert_eq!(result, Callback::Accepted { code: "abc123".to_string() });
    }

    #[test]
    fn test_parse_callback_other_path_is_ignored() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert_eq!(parse_callback_request(request, &redirect(), STATE), Callback::Ignored);
    }

    #[test]
    fn test_parse_callback_missing_state() {
        let request = "GET /callback?code=abc HTTP/1.1\r\n\r\n";
        let result = parse_callback_request(request, &redirect(), STATE);
        assert!(matches!(result, Callback::Rejected { body: "Missing code or state", .. }));
    }

    #[test]
    fn test_parse_callback_state_mismatch() {
        let request = "GET /callback?code=abc&state=wrong HTTP/1.1\r\n\r\n";
        match parse_callback_request(request, &redirect(), STATE) {
            Callback::Rejected { reason, .. } => assert!(reason.contains("mismatch")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_callback_error() {
        let request = "GET /callback?error=access_denied&state=x HTTP/1.1\r\n\r\n";
        match parse_callback_request(request, &redirect(), STATE) {
            Callback::Rejected { reason, .. } => assert!(reason.contains("access_denied")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bind_address_defaults_port() {
        let url = Url::parse("http://localhost/callback").unwrap();
        assert_eq!(bind_address(&url).unwrap(), ("localhost".to_string(), 80));

        let url = Url::parse("http://[::1]:8080/cb").unwrap();
        assert_eq!(bind_address(&url).unwrap(), ("::1".to_string(), 8080));
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_redirect() {
        let grants = Arc::new(FakeGrants::default());
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::open(dir.path().join(".env.local"), StoredTokens::default()).unwrap());

        let redirect = Url::parse("http://127.0.0.1:0/callback").unwrap();
        let server = CallbackServer::bind(&redirect).await.unwrap().with_read_timeout(Duration::from_millis(200));
        let addr = server.local_addr().unwrap();
        let pending = server.spawn(STATE.to_string(), grants.clone(), store.clone());

        // Connects first and never sends a request
        let _idle = TcpStream::connect(addr).await.unwrap();

        let response = reqwest::get(format!("http://{}/callback?code=c1&state={}", addr, STATE)).await.unwrap();
        assert_eq!(response.status(), 200);

        pending.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.read().access_token.as_deref(), Some("access-for-c1"));
        assert_eq!(FakeGrants::count(&grants.exchanges), 1);
    }

    #[tokio::test]
    async fn test_matching_state_completes_and_persists() {
        let grants = Arc::new(FakeGrants::default());
        let (base, pending, store, _dir) = start(grants.clone()).await;

        let response = reqwest::get(format!("{}/callback?code=c1&state={}", base, STATE)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/html"));

        pending.wait(Duration::from_secs(5)).await.unwrap();
        let tokens = store.read();
        assert_eq!(tokens.access_token.as_deref(), Some("access-for-c1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-for-c1"));
        assert_eq!(FakeGrants::count(&grants.exchanges), 1);
    }

    #[tokio::test]
    async fn test_state_mismatch_rejects_without_persisting() {
        let grants = Arc::new(FakeGrants::default());
        let (base, pending, store, _dir) = start(grants.clone()).await;

        let response = reqwest::get(format!("{}/callback?code=c1&state=forged", base)).await.unwrap();
        assert_eq!(response.status(), 400);

        let err = pending.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(!store.has_tokens());
        assert_eq!(FakeGrants::count(&grants.exchanges), 0);
    }

    #[tokio::test]
    async fn test_missing_code_is_bad_request() {
        let (base, pending, store, _dir) = start(Arc::new(FakeGrants::default())).await;

        let response = reqwest::get(format!("{}/callback?state={}", base, STATE)).await.unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(response.text().await.unwrap(), "Missing code or state");

        assert!(pending.wait(Duration::from_secs(5)).await.is_err());
        assert!(!store.has_tokens());
    }

    #[tokio::test]
    async fn test_other_paths_keep_listening() {
        let (base, pending, store, _dir) = start(Arc::new(FakeGrants::default())).await;

        let response = reqwest::get(format!("{}/favicon.ico", base)).await.unwrap();
        assert_eq!(response.status(), 404);
        let response = reqwest::get(format!("{}/other?code=c&state={}", base, STATE)).await.unwrap();
        assert_eq!(response.status(), 404);
        assert!(!store.has_tokens());

        let response = reqwest::get(format!("{}/callback?code=late&state={}", base, STATE)).await.unwrap();
        assert_eq!(response.status(), 200);
        pending.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.read().access_token.as_deref(), Some("access-for-late"));
    }

    #[tokio::test]
    async fn test_exchange_failure_is_server_error() {
        let (base, pending, store, _dir) = start(Arc::new(FakeGrants::failing_exchange())).await;

        let response = reqwest::get(format!("{}/callback?code=c1&state={}", base, STATE)).await.unwrap();
        assert_eq!(response.status(), 500);

        let err = pending.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
        assert!(!store.has_tokens());
    }

    #[tokio::test]
    async fn test_listener_closes_after_terminal_state() {
        let (base, pending, _store, _dir) = start(Arc::new(FakeGrants::default())).await;

        reqwest::get(format!("{}/callback?code=c1&state={}", base, STATE)).await.unwrap();
        pending.wait(Duration::from_secs(5)).await.unwrap();

        let addr = base.trim_start_matches("http://").to_string();
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_base, pending, _store, _dir) = start(Arc::new(FakeGrants::default())).await;
        let err = pending.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_bind_port_in_use_is_auth_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let redirect = Url::parse(&format!("http://127.0.0.1:{}/callback", port)).unwrap();

        let result = CallbackServer::bind(&redirect).await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }
}
