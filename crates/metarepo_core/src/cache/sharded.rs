//! Lock-partitioned memory cache.

use super::shard::{CacheShard, EntryPolicy};
use super::{fnv1_32, Cache, CacheConfig};
use std::sync::Arc;

pub const SHARD_COUNT: usize = 16;

/// Memory cache split into [`SHARD_COUNT`] independently locked shards.
///
/// A key always routes to `fnv1_32(key) % SHARD_COUNT`, so operations on keys
/// in different shards never contend.
#[derive(Debug)]
pub struct ShardedMemoryCache<V> {
    config: CacheConfig,
    shards: Vec<CacheShard<V>>,
}

impl<V> ShardedMemoryCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let policy = EntryPolicy::from_config(&config, SHARD_COUNT);
        let shards = (0..SHARD_COUNT).map(|_| CacheShard::new(policy)).collect();
        Self { config, shards }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(CacheShard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(CacheShard::is_empty)
    }

    fn shard_for(&self, key: &str) -> &CacheShard<V> {
        &self.shards[shard_index(key)]
    }
}

/// Shard a key routes to.
pub fn shard_index(key: &str) -> usize {
    fnv1_32(key.as_bytes()) as usize % SHARD_COUNT
}

impl<V: Send + Sync> Cache<V> for ShardedMemoryCache<V> {
    fn put(&self, key: &str, value: Arc<V>) -> bool {
        self.shard_for(key).add(key, value);
        true
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        self.shard_for(key).get(key)
    }

    fn invalidate(&self, key: &str) {
        self.shard_for(key).remove(key);
    }

    fn invalidate_all(&self) {
        for shard in &self.shards {
            shard.remove_all();
        }
    }
}
