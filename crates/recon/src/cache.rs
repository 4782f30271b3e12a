//! Comparison result cache.
//!
//! Keyed by the sorted, de-duplicated set of source identifiers so that the
//! order in which sources are passed never affects a hit. Bounded by entry
//! count with least-recently-used eviction; a `get` hit refreshes recency.
//! Cached tables are immutable, so a hit is always valid for its key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::ComparisonTable;

pub type CacheKey = Vec<String>;

/// Sort and de-duplicate source identifiers.
pub fn normalize_key<S: AsRef<str>>(source_ids: &[S]) -> CacheKey {
    let mut key: Vec<String> = source_ids.iter().map(|s| s.as_ref().to_string()).collect();
    key.sort();
    key.dedup();
    key
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

struct CacheEntry {
    value: Arc<ComparisonTable>,
    recency: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// recency marker -> key; the smallest marker is the LRU victim.
    order: BTreeMap<u64, CacheKey>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &CacheKey) -> Option<Arc<ComparisonTable>> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.recency);
        entry.recency = tick;
        self.order.insert(tick, key.clone());
        Some(Arc::clone(&entry.value))
    }

    fn evict_lru(&mut self) {
        if let Some((_, victim)) = self.order.pop_first() {
            self.entries.remove(&victim);
            self.evictions += 1;
            log::debug!("result cache evicted {:?}", victim);
        }
    }
}

/// Bounded LRU cache of comparison tables. Mutation is serialized by a
/// single lock, so the cache can be shared across threads.
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get<S: AsRef<str>>(&self, source_ids: &[S]) -> Option<Arc<ComparisonTable>> {
        let key = normalize_key(source_ids);
        let mut inner = self.inner.lock();
        match inner.touch(&key) {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn set<S: AsRef<str>>(&self, source_ids: &[S], table: Arc<ComparisonTable>) {
        if self.capacity == 0 {
            return;
        }
        let key = normalize_key(source_ids);
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();

        if let Some(old) = inner.entries.insert(key.clone(), CacheEntry { value: table, recency: tick }) {
            inner.order.remove(&old.recency);
        }
        inner.order.insert(tick, key);

        while inner.entries.len() > self.capacity {
            inner.evict_lru();
        }
    }

    /// Membership test that does not refresh recency.
    pub fn contains<S: AsRef<str>>(&self, source_ids: &[S]) -> bool {
        self.inner.lock().entries.contains_key(&normalize_key(source_ids))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entries: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(32)
    }
}
