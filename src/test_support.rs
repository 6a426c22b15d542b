//! Loopback HTTP fixtures shared by unit tests.

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use crate::auth::{AuthorizationSession, BrowserLauncher};

/// A canned HTTP response
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Canned {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: String::new(),
        }
    }
}

/// Serve `responses` in order, one per connection, and hand back the raw requests.
pub async fn serve_sequence(responses: Vec<Canned>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                canned.status,
                canned.content_type,
                canned.body.len(),
                canned.body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });

    (base, handle)
}

/// Serve a single response; returns the URL and the captured request.
pub async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: &str,
) -> (String, JoinHandle<String>) {
    let (base, handle) = serve_sequence(vec![Canned {
        status,
        content_type,
        body: body.to_string(),
    }])
    .await;

    let single = tokio::spawn(async move {
        handle.await.unwrap().into_iter().next().unwrap_or_default()
    });
    (base, single)
}

/// Read headers plus a `Content-Length` body
async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

/// A port that was free a moment ago
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// Launcher that plays the browser: follows the redirect with the given state
pub fn redirecting_launcher(forge_state: bool) -> BrowserLauncher {
    Arc::new(move |session: &AuthorizationSession| {
        let state = if forge_state { "forged".to_string() } else { session.csrf_state.clone() };
        let mut target = session.redirect_url.clone();
        target.query_pairs_mut().append_pair("code", "browser-code").append_pair("state", &state);
        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
    })
}
