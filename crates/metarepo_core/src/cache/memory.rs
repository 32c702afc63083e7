//! Single-lock in-memory cache.

use super::shard::{CacheShard, EntryPolicy};
use super::{Cache, CacheConfig};
use std::sync::Arc;

/// Memory cache backed by one map behind one reader-writer lock.
#[derive(Debug)]
pub struct MemoryCache<V> {
    config: CacheConfig,
    items: CacheShard<V>,
}

impl<V> MemoryCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let policy = EntryPolicy::from_config(&config, 1);
        Self {
            config,
            items: CacheShard::new(policy),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<V: Send + Sync> Cache<V> for MemoryCache<V> {
    fn put(&self, key: &str, value: Arc<V>) -> bool {
        self.items.add(key, value);
        true
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        self.items.get(key)
    }

    fn invalidate(&self, key: &str) {
        self.items.remove(key);
    }

    fn invalidate_all(&self) {
        self.items.remove_all();
    }
}
