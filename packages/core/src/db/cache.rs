//! Content Cache
//!
//! LRU pool of loaded content versions keyed by `(content_id, version_no)`.
//! Every entry remembers the generation of the state it was built from and is
//! only served while that generation is not older than the content's last
//! recorded change, so an entry that missed an invalidation is never returned.
//!
//! Commits drop entries of touched content; raw storage access clears the pool.

use crate::models::Content;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct CachedContent {
    generation: u64,
    content: Content,
}

/// Shared pool of loaded content
#[derive(Debug, Clone)]
pub struct ContentCache {
    entries: Arc<Mutex<LruCache<(u64, u32), CachedContent>>>,
}

impl ContentCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Cached content if it is at least as new as `revision`
    pub fn get(&self, content_id: u64, version_no: u32, revision: u64) -> Option<Content> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let key = (content_id, version_no);
        match entries.get(&key) {
            Some(cached) if cached.generation >= revision => Some(cached.content.clone()),
            Some(_) => {
                entries.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, content: Content, generation: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let key = (content.content_info.id, content.version_info.version_no);
        entries.put(
            key,
            CachedContent {
                generation,
                content,
            },
        );
    }

    /// Drop every cached version of the given content items
    pub fn invalidate(&self, content_ids: impl IntoIterator<Item = u64>) {
        let ids: std::collections::HashSet<u64> = content_ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let stale: Vec<(u64, u32)> = entries
            .iter()
            .filter(|((content_id, _), _)| ids.contains(content_id))
            .map(|(key, _)| *key)
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.clear();
    }

    /// Current size and capacity
    pub fn stats(&self) -> (usize, usize) {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        (entries.len(), entries.cap().get())
    }
}
