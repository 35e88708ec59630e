//! Shared test utilities.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::config::{Credentials, Settings};
use crate::db::Db;
use crate::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A home directory with a created `Config` and mapping store. Holds the `TempDir` to keep the
/// directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_vision_url(None).await
    }

    pub async fn with_vision_url(vision_api_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("firefly-importer");
        let settings = Settings::new("http://127.0.0.1:9/api/v1", vision_api_url, "test-model", 30);
        let config = Config::create(&root, settings, Credentials::new("test-token", "test-key"))
            .await
            .unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub async fn db(&self) -> Db {
        self.config.open_store().await.unwrap()
    }
}

/// A loopback HTTP server that answers one connection per scripted response, in order, and keeps
/// the raw text of every request it reads.
pub struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_many(vec![(status, body.into())]).await
    }

    pub async fn start_many<B: Into<String>>(responses: Vec<(u16, B)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Vec<(u16, String)> =
            responses.into_iter().map(|(s, b)| (s, b.into())).collect();

        let seen = requests.clone();
        let handle = tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().await.push(request);
                let reason = reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
                    Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// e.g. `http://127.0.0.1:49152`, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The first request received.
    pub async fn request(&self) -> String {
        self.requests.lock().await.first().cloned().unwrap()
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reads the head of an HTTP/1.1 request, then as much body as `Content-Length` announces.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(head_end) = find(&data, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..head_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn test_fake_server_round_trip() {
    let server = FakeServer::start_many(vec![(200, "one"), (404, "two")]).await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/a", server.url()))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(200, first.status().as_u16());
    assert_eq!("one", first.text().await.unwrap());

    let second = client.get(format!("{}/b", server.url())).send().await.unwrap();
    assert_eq!(404, second.status().as_u16());

    let seen = server.requests().await;
    assert!(seen[0].starts_with("POST /a "));
    assert!(seen[0].ends_with("\r\n\r\nhello"));
    assert!(seen[1].starts_with("GET /b "));
}

#[tokio::test]
async fn test_env() {
    let env = TestEnv::new().await;
    assert!(env.config().sqlite_path().is_file());
    let db = env.db().await;
    db.close().await;
}
