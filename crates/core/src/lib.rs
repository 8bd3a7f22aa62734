#![warn(clippy::all, missing_docs)]

//! Core domain logic for the release board.
//!
//! This crate hosts the release models, the per-platform selection
//! rules, configuration handling, and feed loading/synchronisation
//! used by the terminal UI and any future frontends.

pub mod calendar;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod selector;

pub use calendar::WeekRange;
pub use crate::config::AppConfig;
pub use error::FeedError;
pub use feed::{FeedEvent, FeedLoader, FeedSource, FeedSync, ReloadReason, ReloadRequester};
pub use models::{GameRelease, ReleaseFeed};
pub use selector::{select, FreshnessRule, PlatformReleases, PlatformSelection};
