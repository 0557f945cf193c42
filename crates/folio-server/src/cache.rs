//! Diagnostic content cache.
//!
//! Reads never consult this cache; they always go to the store. The listing
//! endpoint records what it served, and every change clears it. Status output
//! reports its size and timestamps.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_store::MarkdownDocument;
use tokio::sync::RwLock;

/// Cache handle shared between request handlers and the change pipeline.
pub type SharedCache = Arc<RwLock<ContentCache>>;

#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<String, MarkdownDocument>,
    last_updated: Option<DateTime<Utc>>,
    last_invalidated: Option<DateTime<Utc>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Record a full listing.
    pub fn record_listing(&mut self, docs: &[MarkdownDocument]) {
        self.entries = docs
            .iter()
            .map(|doc| (doc.id.clone(), doc.clone()))
            .collect();
        self.last_updated = Some(Utc::now());
    }

    /// Drop everything after a change in the store.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.last_updated = None;
        self.last_invalidated = Some(Utc::now());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn last_invalidated(&self) -> Option<DateTime<Utc>> {
        self.last_invalidated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> MarkdownDocument {
        MarkdownDocument::parse(id, "body").unwrap()
    }

    #[test]
    fn records_and_invalidates() {
        let mut cache = ContentCache::new();
        assert!(cache.last_updated().is_none());

        cache.record_listing(&[doc("a"), doc("b")]);
        assert_eq!(cache.len(), 2);
        assert!(cache.last_updated().is_some());

        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.last_updated().is_none());
        assert!(cache.last_invalidated().is_some());
    }
}
