//! A tiny local HTTP server for crawl tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::trace;

const DEFAULT_PAGE: &str = "<html><body>ok</body></html>";
const MAX_HEAD: usize = 16 * 1024;

#[derive(Debug, Default)]
struct State {
    pages: Option<HashMap<String, String>>,
    hits: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

/// Serves fixed HTML pages on `127.0.0.1` and counts hits.
///
/// Every connection answers one request and is closed. The server shuts
/// down when dropped.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<State>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server answering every path with a 200 page.
    pub async fn start() -> std::io::Result<Self> {
        Self::serve(State::default()).await
    }

    /// Starts a server answering only `pages` (path to HTML body); other
    /// paths get a 404.
    pub async fn with_pages<'a>(pages: impl IntoIterator<Item = (&'a str, &'a str)>) -> std::io::Result<Self> {
        let pages = pages
            .into_iter()
            .map(|(path, body)| (path.to_string(), body.to_string()))
            .collect();
        Self::serve(State {
            pages: Some(pages),
            ..State::default()
        })
        .await
    }

    async fn serve(state: State) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(state);

        let accept_state = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    if let Err(err) = answer(socket, &state).await {
                        trace!(error = %err, "Test server connection failed");
                    }
                });
            }
        });

        Ok(Self { addr, state, task })
    }

    /// Absolute URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Socket address the server listens on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of requests answered.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::Acquire)
    }

    /// Paths requested, in arrival order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.state.paths.lock().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(mut socket: TcpStream, state: &State) -> std::io::Result<()> {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_HEAD {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let (status, body) = match &state.pages {
        None => ("200 OK", DEFAULT_PAGE.to_string()),
        Some(pages) => match pages.get(&path) {
            Some(body) => ("200 OK", body.clone()),
            None => ("404 Not Found", "<html><body>not found</body></html>".to_string()),
        },
    };

    state.paths.lock().push(path);
    state.hits.fetch_add(1, Ordering::AcqRel);

    let reply = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(reply.as_bytes()).await?;
    socket.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_counts_hits() {
        let server = TestServer::start().await.unwrap();
        let body = reqwest::get(server.url("/a")).await.unwrap().text().await.unwrap();

        assert_eq!(body, DEFAULT_PAGE);
        assert_eq!(server.hits(), 1);
        assert_eq!(server.paths(), vec!["/a".to_string()]);
    }

    #[tokio::test]
    async fn test_server_with_pages_returns_404_for_unknown_paths() {
        let server = TestServer::with_pages([("/", "<a href=\"/x\">x</a>")]).await.unwrap();
        let response = reqwest::get(server.url("/missing")).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
