//! Knowledge sources with change detection.
//!
//! A source hands back either the full document together with its change
//! token, or "not modified" when the caller's precondition still holds.

use chrono::{DateTime, Utc};
use pitlane_core::{AppError, AppResult};
use reqwest::header::{HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opaque identity of one version of the knowledge document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeToken {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The precondition matched; the caller's copy is current.
    NotModified,
    /// A full document body.
    Body { body: String, token: ChangeToken },
}

/// Trait for knowledge document sources.
#[async_trait::async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Human-readable location, for logs and status output.
    fn describe(&self) -> String;

    /// Fetch the document. With `precondition` set, the source may answer
    /// `NotModified` instead of sending the body.
    async fn fetch(&self, precondition: Option<&ChangeToken>) -> AppResult<FetchOutcome>;
}

/// Create a source from a configured location (URL or file path).
pub fn create_source(location: &str) -> AppResult<Arc<dyn KnowledgeSource>> {
    let location = location.trim();
    if location.is_empty() {
        return Err(AppError::Config("Knowledge source is empty".to_string()));
    }

    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(location)?))
    } else {
        Ok(Arc::new(FileSource::new(location)))
    }
}

/// Remote document fetched over HTTP with conditional requests.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl KnowledgeSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    #[tracing::instrument(skip(self, precondition), fields(url = %self.url))]
    async fn fetch(&self, precondition: Option<&ChangeToken>) -> AppResult<FetchOutcome> {
        let mut request = self.client.get(&self.url);

        if let Some(token) = precondition {
            if let Some(ref etag) = token.etag {
                request = request.header(IF_NONE_MATCH, etag);
            }
            if let Some(ref modified) = token.last_modified {
                request = request.header(IF_MODIFIED_SINCE, modified);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::SourceSync(format!("Failed to fetch {}: {}", self.url, e)))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }

        if !response.status().is_success() {
            return Err(AppError::SourceSync(format!(
                "Knowledge source returned {} for {}",
                response.status(),
                self.url
            )));
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let token = ChangeToken {
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
        };

        let body = response
            .text()
            .await
            .map_err(|e| AppError::SourceSync(format!("Failed to read body: {}", e)))?;

        Ok(FetchOutcome::Body { body, token })
    }
}

/// Local document; the file modification time is the change token.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn modified_token(&self) -> AppResult<ChangeToken> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| {
                AppError::SourceSync(format!("Failed to stat {:?}: {}", self.path, e))
            })?;

        let modified: DateTime<Utc> = modified.into();
        Ok(ChangeToken {
            etag: None,
            last_modified: Some(modified.to_rfc3339()),
        })
    }
}

#[async_trait::async_trait]
impl KnowledgeSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self, precondition: Option<&ChangeToken>) -> AppResult<FetchOutcome> {
        let token = self.modified_token()?;

        if precondition == Some(&token) {
            return Ok(FetchOutcome::NotModified);
        }

        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::SourceSync(format!("Failed to read {:?}: {}", self.path, e))
        })?;

        Ok(FetchOutcome::Body { body, token })
    }
}

/// In-process document, versioned by a counter etag.
///
/// Used for embedding a fixed document and for driving refresh in tests.
pub struct MemorySource {
    state: Mutex<(String, u64)>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            state: Mutex::new((body.into(), 1)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the document; the next conditional fetch returns it.
    pub fn set_body(&self, body: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.0 = body.into();
            state.1 += 1;
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KnowledgeSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn fetch(&self, precondition: Option<&ChangeToken>) -> AppResult<FetchOutcome> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (body, version) = self
            .state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| AppError::SourceSync("memory source lock poisoned".to_string()))?;

        let token = ChangeToken {
            etag: Some(format!("\"v{}\"", version)),
            last_modified: None,
        };
        if precondition == Some(&token) {
            return Ok(FetchOutcome::NotModified);
        }
        Ok(FetchOutcome::Body { body, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ETAG_V7: &str = "\"v7\"";
    const MODIFIED: &str = "Wed, 14 Oct 2026 08:00:00 GMT";

    fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            body.len()
        );
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    /// Serve one response per connection, chosen from the lowercased request
    /// head. Returns the document URL and the request heads seen so far.
    async fn serve<F>(respond: F) -> (String, Arc<Mutex<Vec<String>>>)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_lowercase();
                let reply = respond(&head);
                log.lock().unwrap().push(head);
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/knowledge.json", addr), seen)
    }

    #[tokio::test]
    async fn test_http_source_conditional_fetch() {
        let (url, seen) = serve(|head| {
            if head.contains("if-none-match: \"v7\"") {
                http_response("304 Not Modified", &[("ETag", ETAG_V7)], "")
            } else {
                http_response(
                    "200 OK",
                    &[("ETag", ETAG_V7), ("Last-Modified", MODIFIED)],
                    "{\"site\":{}}",
                )
            }
        })
        .await;
        let source = HttpSource::new(&url).unwrap();

        let token = match source.fetch(None).await.unwrap() {
            FetchOutcome::Body { body, token } => {
                assert_eq!(body, "{\"site\":{}}");
                token
            }
            FetchOutcome::NotModified => panic!("unconditional fetch must return a body"),
        };
        assert_eq!(token.etag.as_deref(), Some(ETAG_V7));
        assert_eq!(token.last_modified.as_deref(), Some(MODIFIED));

        assert_eq!(
            source.fetch(Some(&token)).await.unwrap(),
            FetchOutcome::NotModified
        );

        // A stale etag gets the full body again.
        let stale = ChangeToken {
            etag: Some("\"v6\"".to_string()),
            last_modified: None,
        };
        assert!(matches!(
            source.fetch(Some(&stale)).await.unwrap(),
            FetchOutcome::Body { .. }
        ));

        let heads = seen.lock().unwrap().clone();
        assert_eq!(heads.len(), 3);
        assert!(!heads[0].contains("if-none-match"));
        assert!(!heads[0].contains("if-modified-since"));
        assert!(heads[1].contains("if-none-match: \"v7\""));
        assert!(heads[1].contains(&format!("if-modified-since: {}", MODIFIED.to_lowercase())));
        assert!(heads[2].contains("if-none-match: \"v6\""));
    }

    #[tokio::test]
    async fn test_http_source_error_status() {
        let (url, _) = serve(|_| http_response("500 Internal Server Error", &[], "oops")).await;
        let source = HttpSource::new(&url).unwrap();

        match source.fetch(None).await {
            Err(AppError::SourceSync(msg)) => assert!(msg.contains("500")),
            other => panic!("expected source sync error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_source_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpSource::new(format!("http://{}/knowledge.json", addr)).unwrap();
        let result = source.fetch(None).await;
        assert!(matches!(result, Err(AppError::SourceSync(_))));
    }

    #[test]
    fn test_create_source_kinds() {
        assert!(create_source("https://example.com/kb.json").is_ok());
        assert_eq!(
            create_source("./kb.json").unwrap().describe(),
            "./kb.json"
        );
        assert!(create_source("  ").is_err());
    }

    #[tokio::test]
    async fn test_file_source_not_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kb.json");
        std::fs::write(&path, "{}").unwrap();
        let source = FileSource::new(&path);

        let token = match source.fetch(None).await.unwrap() {
            FetchOutcome::Body { body, token } => {
                assert_eq!(body, "{}");
                token
            }
            FetchOutcome::NotModified => panic!("first fetch must return a body"),
        };

        assert_eq!(
            source.fetch(Some(&token)).await.unwrap(),
            FetchOutcome::NotModified
        );

        // A stale precondition gets the body again.
        let stale = ChangeToken {
            etag: None,
            last_modified: Some("1970-01-01T00:00:00+00:00".to_string()),
        };
        assert!(matches!(
            source.fetch(Some(&stale)).await.unwrap(),
            FetchOutcome::Body { .. }
        ));
    }

    #[tokio::test]
    async fn test_memory_source_versions() {
        let source = MemorySource::new("one");
        let FetchOutcome::Body { token, .. } = source.fetch(None).await.unwrap() else {
            panic!("expected body");
        };
        assert_eq!(
            source.fetch(Some(&token)).await.unwrap(),
            FetchOutcome::NotModified
        );

        source.set_body("two");
        match source.fetch(Some(&token)).await.unwrap() {
            FetchOutcome::Body { body, .. } => assert_eq!(body, "two"),
            FetchOutcome::NotModified => panic!("body changed"),
        }
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileSource::new("/nonexistent/kb.json");
        let result = source.fetch(None).await;
        assert!(matches!(result, Err(AppError::SourceSync(_))));
    }
}
