mod app;
mod board;
mod bubble;
mod launch;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};
use releaseboard_core::{
    config::{self, AppConfig},
    feed::{FeedLoader, FeedSync},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let loader = FeedLoader::new(config.feed_source());
    let sync = FeedSync::new(loader.clone(), config.watch);
    let reload = sync.requester();

    let (feed_tx, feed_rx) = mpsc::channel(8);
    tokio::spawn(async move {
        if let Err(err) = sync.run(feed_tx).await {
            tracing::error!("Feed sync task error: {err}");
        }
    });

    let mut app = app::ReleaseBoardApp::new(config, loader, reload);
    app.attach_feed(feed_rx);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("releaseboard.log"))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The board owns the terminal, so everything goes to the log file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
