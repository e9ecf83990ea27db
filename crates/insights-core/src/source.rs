//! Data sources that yield the full conversation collection in one shot.
//!
//! A source either returns every record or fails; there is no paging and no
//! partial result.

use crate::config::{SourceConfig, SourceKind};
use crate::error::{InsightsError, Result};
use crate::types::ConversationRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetch-all contract consumed by the conversation store.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short description used in log lines, e.g. the file path or URL.
    fn describe(&self) -> String;

    /// Fetch the complete record collection.
    async fn fetch_all(&self) -> Result<Vec<ConversationRecord>>;
}

/// Reads a JSON array of records from disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_all(&self) -> Result<Vec<ConversationRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<ConversationRecord> = serde_json::from_str(&contents)?;
        tracing::debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// Issues a parameterless GET and parses the body as a JSON array of records.
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    /// Build a source for `raw_url`. Only http and https are accepted.
    pub fn new(raw_url: &str, timeout: Duration) -> Result<Self> {
        let url = validate_url(raw_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("call-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

fn validate_url(raw_url: &str) -> Result<Url> {
    let parsed =
        Url::parse(raw_url).map_err(|e| InsightsError::InvalidUrl(format!("{}: {}", raw_url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(InsightsError::InvalidUrl(format!(
            "scheme '{}' is not allowed (only http/https)",
            other
        ))),
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch_all(&self) -> Result<Vec<ConversationRecord>> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightsError::HttpStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.text().await?;
        let records: Vec<ConversationRecord> = serde_json::from_str(&body)?;
        tracing::debug!("Fetched {} records from {}", records.len(), self.url);
        Ok(records)
    }
}

/// Build the source selected by configuration.
pub fn source_from_config(config: &SourceConfig) -> Result<Arc<dyn DataSource>> {
    match config.kind {
        SourceKind::File => Ok(Arc::new(FileSource::new(&config.path))),
        SourceKind::Http => Ok(Arc::new(HttpSource::new(
            &config.url,
            Duration::from_secs(config.timeout_secs),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SAMPLE: &str = r#"[
        {
            "id": "c1",
            "agent": "agent_1",
            "startTime": 1700000000000,
            "duration": 60,
            "cost": 1.5,
            "status": "success",
            "callInfo": {"caller": "555-0100", "callee": "555-0199", "type": "inbound",
                         "stats": {"llmLatency": 300, "ttsLatency": 120, "interruptions": 1}}
        },
        {
            "id": "c2",
            "agent": "agent_2",
            "startTime": 1700000100000,
            "duration": 30,
            "cost": 0.5,
            "status": "dropped",
            "callInfo": {"caller": "555-0101", "callee": "555-0200", "type": "outbound"}
        }
    ]"#;

    /// Serve exactly one HTTP response on a local port and return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/api/conversations", addr)
    }

    #[tokio::test]
    async fn test_file_source_reads_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Mock Data.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let source = FileSource::new(&path);
        let records = source.fetch_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, CallStatus::Dropped);
        assert!(records[1].stats().is_none());
        assert!(source.describe().ends_with("Mock Data.json"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("absent.json"));
        assert!(matches!(source.fetch_all().await, Err(InsightsError::Io(_))));
    }

    #[tokio::test]
    async fn test_file_source_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"error": "Failed to load conversation data"}"#).unwrap();

        let source = FileSource::new(&path);
        assert!(matches!(
            source.fetch_all().await,
            Err(InsightsError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_http_source_fetches_records() {
        let url = serve_once("200 OK", SAMPLE).await;
        let source = HttpSource::new(&url, Duration::from_secs(5)).unwrap();
        let records = source.fetch_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent, "agent_1");
    }

    #[tokio::test]
    async fn test_http_source_error_status() {
        let url = serve_once(
            "500 Internal Server Error",
            r#"{"error":"Failed to load conversation data"}"#,
        )
        .await;
        let source = HttpSource::new(&url, Duration::from_secs(5)).unwrap();
        match source.fetch_all().await {
            Err(InsightsError::HttpStatus { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected HttpStatus error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_http_source_rejects_scheme() {
        let err = HttpSource::new("file:///etc/passwd", Duration::from_secs(1)).err();
        assert!(matches!(err, Some(InsightsError::InvalidUrl(_))));
        assert!(HttpSource::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_source_from_config() {
        let mut config = SourceConfig::default();
        let file = source_from_config(&config).unwrap();
        assert!(file.describe().ends_with("conversations.json"));

        config.kind = SourceKind::Http;
        config.url = "https://insights.example.com/api/conversations".into();
        let http = source_from_config(&config).unwrap();
        assert_eq!(http.describe(), "https://insights.example.com/api/conversations");

        config.url = "ftp://insights.example.com/data".into();
        assert!(source_from_config(&config).is_err());
    }
}
