//! Mock attachment service for session and queue tests.
//!
//! Serves the token/chunk/commit endpoints over a real TCP socket so the
//! pipeline is exercised through `reqwest`, records every request in
//! arrival order, and can be told to fail specific steps.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: String,
    pub body: String,
}

/// Failure and timing knobs for one server instance.
#[derive(Debug, Clone)]
pub(crate) struct MockBehavior {
    pub fail_token: bool,
    /// Fails the nth chunk request seen by the server (0-based, counted
    /// across all files).
    pub fail_chunk_index: Option<usize>,
    pub fail_commit: bool,
    pub response_delay: Option<Duration>,
    pub file_url: String,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            fail_token: false,
            fail_chunk_index: None,
            fail_commit: false,
            response_delay: None,
            file_url: "https://files.example.com/f/abc123".to_string(),
        }
    }
}

pub(crate) struct MockAttachmentServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockAttachmentServer {
    pub async fn start() -> Self {
        Self::with_behavior(MockBehavior::default()).await
    }

    pub async fn with_behavior(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let handle = tokio::spawn(async move {
            let mut chunk_count = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                if let Some(delay) = behavior.response_delay {
                    tokio::time::sleep(delay).await;
                }
                let (status, body) = respond_to(&request, &behavior, &mut chunk_count);
                recorded.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len(),
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url,
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path` per request, in arrival order.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn chunk_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with("/chunk"))
            .collect()
    }

    pub fn commit_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .collect()
    }
}

impl Drop for MockAttachmentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Extracts and decodes the base64 file part of a chunk request body.
pub(crate) fn chunk_payload(body: &str) -> Vec<u8> {
    let marker = "Content-Transfer-Encoding: base64\r\n\r\n";
    let start = body.find(marker).expect("no base64 part in body") + marker.len();
    let end = body[start..].find("\r\n").expect("unterminated part") + start;
    STANDARD.decode(&body[start..end]).expect("invalid base64")
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 1024 * 1024 {
            return None;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let request_line = headers.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn respond_to(
    request: &RecordedRequest,
    behavior: &MockBehavior,
    chunk_count: &mut usize,
) -> (&'static str, String) {
    if request.path.ends_with("/attachment/file/token") {
        if behavior.fail_token {
            return (
                "500 Internal Server Error",
                r#"{"error":"token unavailable"}"#.to_string(),
            );
        }
        return (
            "200 OK",
            r#"{"fileToken":"tok-1","expiresOn":1700000000000}"#.to_string(),
        );
    }

    if request.path.ends_with("/chunk") {
        let index = *chunk_count;
        *chunk_count += 1;
        if behavior.fail_chunk_index == Some(index) {
            return (
                "500 Internal Server Error",
                r#"{"error":"chunk rejected"}"#.to_string(),
            );
        }
        return ("200 OK", "{}".to_string());
    }

    if request.method == "PUT" {
        if behavior.fail_commit {
            return (
                "500 Internal Server Error",
                r#"{"error":"commit rejected"}"#.to_string(),
            );
        }
        return ("200 OK", behavior.file_url.clone());
    }

    ("404 Not Found", String::new())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
