use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::FeedError,
    models::{GameRelease, ReleaseFeed},
};

/// Where the releases document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Local JSON file.
    File(PathBuf),
    /// Remote JSON document fetched over HTTP(S).
    Url(String),
}

impl FeedSource {
    /// Interpret a configured source string; `http://` and `https://` prefixes
    /// denote URLs, anything else is a filesystem path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// Path of a local source.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Loads the releases document and remembers the last good copy.
#[derive(Clone)]
pub struct FeedLoader {
    source: FeedSource,
    client: reqwest::Client,
    latest: Arc<RwLock<Option<ReleaseFeed>>>,
}

impl FeedLoader {
    /// Build a loader for `source`.
    pub fn new(source: FeedSource) -> Self {
        Self {
            source,
            client: reqwest::Client::new(),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Configured source.
    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Last successfully loaded feed, if any.
    pub fn latest(&self) -> Option<ReleaseFeed> {
        self.latest.read().clone()
    }

    /// Load and decode the document once. On success the result also
    /// replaces the cached copy; on failure the cache is left as it was.
    pub async fn fetch(&self) -> Result<ReleaseFeed, FeedError> {
        let body = match &self.source {
            FeedSource::File(path) => read_file(path).await?,
            FeedSource::Url(url) => self.get(url).await?,
        };
        let feed = decode_feed(&body)?;
        info!(
            source = %self.source,
            releases = feed.len(),
            skipped = feed.skipped,
            "Release feed loaded"
        );
        *self.latest.write() = Some(feed.clone());
        Ok(feed)
    }

    async fn get(&self, url: &str) -> Result<String, FeedError> {
        debug!(url, "Requesting release feed");
        let transport = |source| FeedError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        response.text().await.map_err(transport)
    }
}

async fn read_file(path: &Path) -> Result<String, FeedError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Decode a `{ "games": [...] }` document.
///
/// A missing or non-array `games` member fails the whole document.
/// Individual entries that do not decode are dropped and counted.
pub fn decode_feed(body: &str) -> Result<ReleaseFeed, FeedError> {
    let document: Value = serde_json::from_str(body)?;
    let games = document
        .get("games")
        .and_then(Value::as_array)
        .ok_or(FeedError::Shape)?;

    let mut feed = ReleaseFeed::default();
    for (index, entry) in games.iter().enumerate() {
        match GameRelease::deserialize(entry) {
            Ok(release) => feed.releases.push(release),
            Err(err) => {
                warn!(index, %err, "Skipping undecodable release");
                feed.skipped += 1;
            }
        }
    }
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    const SAMPLE: &str = r#"{
        "games": [
            {"platform": "sony", "date": "2024-01-05", "title": "A", "link": "https://a"},
            {"platform": "xbox", "date": "not a date", "title": "B"},
            {"platform": "xbox", "date": "2024-01-12", "title": "C", "trailer": "https://www.youtube.com/watch?v=c"}
        ]
    }"#;

    async fn serve_once(status_line: &'static str, body: &'static str) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(format!("http://{addr}/games.json"))
    }

    #[test]
    fn parses_sources() {
        assert_eq!(
            FeedSource::parse("HTTPS://example.com/games.json"),
            FeedSource::Url("HTTPS://example.com/games.json".to_string())
        );
        assert_eq!(
            FeedSource::parse(" data/games.json "),
            FeedSource::File(PathBuf::from("data/games.json"))
        );
        assert!(FeedSource::parse("games.json").local_path().is_some());
    }

    #[test]
    fn decodes_games_and_counts_skipped_entries() -> Result<()> {
        let feed = decode_feed(SAMPLE)?;
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.releases[0].title, "A");
        assert_eq!(feed.releases[1].title, "C");
        Ok(())
    }

    #[test]
    fn rejects_documents_without_games_array() {
        assert!(matches!(decode_feed(r#"{"games": {"a": 1}}"#), Err(FeedError::Shape)));
        assert!(matches!(decode_feed(r#"{"items": []}"#), Err(FeedError::Shape)));
        assert!(matches!(decode_feed("[]"), Err(FeedError::Shape)));
        assert!(matches!(decode_feed("{not json"), Err(FeedError::Json(_))));
    }

    #[test]
    fn empty_games_array_is_valid() -> Result<()> {
        let feed = decode_feed(r#"{"games": []}"#)?;
        assert!(feed.is_empty());
        assert_eq!(feed.skipped, 0);
        Ok(())
    }

    #[tokio::test]
    async fn loads_file_and_caches_result() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        std::fs::write(&path, SAMPLE)?;

        let loader = FeedLoader::new(FeedSource::File(path.clone()));
        assert!(loader.latest().is_none());
        let feed = loader.fetch().await?;
        assert_eq!(feed.len(), 2);
        assert_eq!(loader.latest(), Some(feed));

        std::fs::write(&path, r#"{"games": 3}"#)?;
        assert!(matches!(loader.fetch().await, Err(FeedError::Shape)));
        assert_eq!(loader.latest().map(|feed| feed.len()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_io_error() -> Result<()> {
        let dir = tempdir()?;
        let loader = FeedLoader::new(FeedSource::File(dir.path().join("absent.json")));
        assert!(matches!(loader.fetch().await, Err(FeedError::Io { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn loads_over_http() -> Result<()> {
        let url = serve_once("200 OK", r#"{"games": [{"platform": "xbox", "date": "2024-01-12"}]}"#).await?;
        let loader = FeedLoader::new(FeedSource::parse(&url));
        let feed = loader.fetch().await?;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.releases[0].platform, "xbox");
        Ok(())
    }

    #[tokio::test]
    async fn http_error_status_is_reported() -> Result<()> {
        let url = serve_once("404 Not Found", "{}").await?;
        let loader = FeedLoader::new(FeedSource::parse(&url));
        let err = loader.fetch().await.expect_err("404 should fail");
        assert!(matches!(err, FeedError::Status(404)));
        assert_eq!(err.to_string(), "HTTP error! status: 404");
        Ok(())
    }
}
