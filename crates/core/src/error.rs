//! Typed errors raised while loading the release feed.

use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of a single feed load.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The local source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The remote source answered with a non-success status.
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The request never produced a usable response.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The body was not valid JSON.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document has no `games` array.
    #[error("Games data is not an array")]
    Shape,
}
