//! Content API server for a directory of markdown files.
//!
//! Serves the store as JSON, watches it for changes and triggers downstream
//! site builds through a debounced dispatcher.

pub mod api;
pub mod cache;
pub mod pipeline;
pub mod server;
pub mod watcher;

pub use api::{router, AppState, SharedState};
pub use cache::{ContentCache, SharedCache};
pub use pipeline::ChangePipeline;
pub use server::{ContentServer, ServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchOptions};
