use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::time::{Duration, Instant};
use crate::models::CandidateProfile;

/// Queries shorter than this clear the results instead of searching
pub const MIN_QUERY_CHARS: usize = 2;

/// Trimmed query if it is long enough to be sent, `None` otherwise
pub fn searchable_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub query: String,
    pub filter_signature: String,
}

impl SearchKey {
    pub fn new(query: impl Into<String>, filter_signature: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter_signature: filter_signature.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchCacheEntry {
    pub results: Vec<CandidateProfile>,
    pub cached_at: Instant,
}

/// Bounded, time-limited cache of remote search results
///
/// Lookups use `peek` so reads never refresh recency: the LRU order stays the
/// insertion order and eviction always drops the oldest entry.
pub struct SearchCache {
    entries: LruCache<SearchKey, SearchCacheEntry>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    pub fn get(&mut self, key: &SearchKey, now: Instant) -> Option<Vec<CandidateProfile>> {
        let expired = match self.entries.peek(key) {
            Some(entry) => now.saturating_duration_since(entry.cached_at) > self.ttl,
            None => return None,
        };

        if expired {
            self.entries.pop(key);
            tracing::trace!("Search cache expired: {:?}", key);
            return None;
        }

        tracing::trace!("Search cache hit: {:?}", key);
        self.entries.peek(key).map(|entry| entry.results.clone())
    }

    pub fn insert(&mut self, key: SearchKey, results: Vec<CandidateProfile>, now: Instant) {
        // Re-inserting a key must count as the newest entry
        self.entries.pop(&key);
        let evicted = self.entries.push(key, SearchCacheEntry { results, cached_at: now });
        if let Some((old_key, _)) = evicted {
            tracing::trace!("Search cache evicted: {:?}", old_key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
