use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{error::FeedError, feed::loader::FeedLoader, models::ReleaseFeed};

const REQUEST_CAPACITY: usize = 4;

/// Events emitted by the background feed task.
#[derive(Debug)]
pub enum FeedEvent {
    /// A load completed with a decoded document.
    Loaded(ReleaseFeed),
    /// A load failed; the previous feed stays in effect.
    Error(FeedError),
}

/// Why a reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// Asked for by the user.
    Manual,
    /// The watched source file changed on disk.
    FileChanged,
}

/// Cloneable handle for asking the feed task to reload.
#[derive(Debug, Clone)]
pub struct ReloadRequester {
    sender: mpsc::Sender<ReloadReason>,
}

impl ReloadRequester {
    /// Queue a reload. Returns `false` when one is already pending or the
    /// task has stopped.
    pub fn request(&self, reason: ReloadReason) -> bool {
        self.sender.try_send(reason).is_ok()
    }
}

/// Coordinates loading the releases document off the UI thread.
pub struct FeedSync {
    loader: FeedLoader,
    watch: bool,
    requests_tx: mpsc::Sender<ReloadReason>,
    requests_rx: mpsc::Receiver<ReloadReason>,
}

impl FeedSync {
    /// Create a synchroniser; `watch` enables reloads on local file changes.
    pub fn new(loader: FeedLoader, watch: bool) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CAPACITY);
        Self {
            loader,
            watch,
            requests_tx,
            requests_rx,
        }
    }

    /// Handle for requesting reloads while the task runs.
    pub fn requester(&self) -> ReloadRequester {
        ReloadRequester {
            sender: self.requests_tx.clone(),
        }
    }

    /// Load once, then reload on every request. Stops when the receiving
    /// side of `sender` is dropped or every [`ReloadRequester`] (and the
    /// file watcher) is gone.
    pub async fn run(self, sender: mpsc::Sender<FeedEvent>) -> Result<()> {
        let FeedSync {
            loader,
            watch,
            requests_tx,
            mut requests_rx,
        } = self;

        let _watcher = match loader.source().local_path() {
            Some(path) if watch => {
                let requester = ReloadRequester {
                    sender: requests_tx.clone(),
                };
                match watch_file(path, requester) {
                    Ok(watcher) => Some(watcher),
                    Err(err) => {
                        warn!(?err, "Feed file watching disabled");
                        None
                    }
                }
            }
            _ => None,
        };
        drop(requests_tx);

        if !load_into(&loader, &sender).await {
            return Ok(());
        }

        while let Some(reason) = requests_rx.recv().await {
            while requests_rx.try_recv().is_ok() {}
            info!(?reason, source = %loader.source(), "Reloading release feed");
            if !load_into(&loader, &sender).await {
                break;
            }
        }
        debug!("Feed sync stopped");

        Ok(())
    }
}

async fn load_into(loader: &FeedLoader, sender: &mpsc::Sender<FeedEvent>) -> bool {
    let event = match loader.fetch().await {
        Ok(feed) => FeedEvent::Loaded(feed),
        Err(err) => {
            error!(%err, source = %loader.source(), "Error fetching or processing data");
            FeedEvent::Error(err)
        }
    };
    if sender.send(event).await.is_err() {
        debug!("Feed event receiver closed");
        return false;
    }
    true
}

fn watch_file(path: &Path, requester: ReloadRequester) -> Result<RecommendedWatcher> {
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        let event = match result {
            Ok(event) => event,
            Err(err) => {
                warn!(?err, "Feed watcher error");
                return;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        if event
            .paths
            .iter()
            .any(|changed| changed.file_name() == Some(file_name.as_os_str()))
        {
            requester.request(ReloadReason::FileChanged);
        }
    })
    .context("failed to create feed watcher")?;

    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", directory.display()))?;
    info!(directory = %directory.display(), "Watching feed source for changes");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedSource;
    use std::{fs, time::Duration};
    use tempfile::tempdir;
    use tokio::time::timeout;

    const ONE_GAME: &str = r#"{"games": [{"platform": "xbox", "date": "2024-01-12"}]}"#;
    const TWO_GAMES: &str = r#"{"games": [
        {"platform": "xbox", "date": "2024-01-12"},
        {"platform": "sony", "date": "2024-01-05"}
    ]}"#;

    #[tokio::test]
    async fn emits_initial_load_and_manual_reloads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(&path, ONE_GAME)?;

        let sync = FeedSync::new(FeedLoader::new(FeedSource::File(path.clone())), false);
        let requester = sync.requester();
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(sync.run(tx));

        match rx.recv().await {
            Some(FeedEvent::Loaded(feed)) => assert_eq!(feed.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }

        fs::write(&path, r#"{"games": "nope"}"#)?;
        assert!(requester.request(ReloadReason::Manual));
        match rx.recv().await {
            Some(FeedEvent::Error(FeedError::Shape)) => {}
            other => panic!("unexpected event: {other:?}"),
        }

        drop(rx);
        assert!(requester.request(ReloadReason::Manual));
        task.await??;
        Ok(())
    }

    #[tokio::test]
    async fn stops_once_every_requester_is_dropped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(&path, ONE_GAME)?;

        let sync = FeedSync::new(FeedLoader::new(FeedSource::File(path)), false);
        let requester = sync.requester();
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(sync.run(tx));

        assert!(matches!(rx.recv().await, Some(FeedEvent::Loaded(_))));
        drop(requester);

        timeout(Duration::from_secs(5), task).await???;
        assert!(rx.recv().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reloads_when_watched_file_changes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(&path, ONE_GAME)?;

        let sync = FeedSync::new(FeedLoader::new(FeedSource::File(path.clone())), true);
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(sync.run(tx));

        match rx.recv().await {
            Some(FeedEvent::Loaded(feed)) => assert_eq!(feed.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }

        fs::write(&path, TWO_GAMES)?;
        let reloaded = timeout(Duration::from_secs(10), async {
            // A single save can surface as several events, some mid-write.
            while let Some(event) = rx.recv().await {
                if let FeedEvent::Loaded(feed) = event {
                    if feed.len() == 2 {
                        return true;
                    }
                }
            }
            false
        })
        .await?;
        assert!(reloaded, "no reload after the file changed");

        drop(rx);
        task.abort();
        Ok(())
    }
}
