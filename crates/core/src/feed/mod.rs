//! Release feed loading and synchronisation.

/// Source parsing, document decoding, and the cached loader.
pub mod loader;
/// Background load task with reload requests and file watching.
pub mod sync;

pub use loader::{decode_feed, FeedLoader, FeedSource};
pub use sync::{FeedEvent, FeedSync, ReloadReason, ReloadRequester};
