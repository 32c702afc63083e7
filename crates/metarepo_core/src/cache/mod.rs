//! Read-through caches placed in front of repository lookups.
//!
//! # Responsibility
//! - Define the `Cache` contract (put/get/get-or-compute/invalidate).
//! - Provide memory, 16-way sharded and no-op backends.
//!
//! # Invariants
//! - Locks are held for one map access only, never across `compute`.
//! - A failed compute is returned to the caller and never stored.
//! - Concurrent misses on one key may each compute; the last put wins.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod memory;
pub mod noop;
pub mod provider;
pub mod shard;
pub mod sharded;

pub use memory::MemoryCache;
pub use noop::NoOpCache;
pub use provider::{CacheProvider, CacheRegistry, ConfiguredCache};
pub use sharded::{ShardedMemoryCache, SHARD_COUNT};

/// Key/value cache holding shared values.
pub trait Cache<V>: Send + Sync {
    /// Stores or replaces `key`. Returns whether the value was accepted.
    fn put(&self, key: &str, value: Arc<V>) -> bool;

    fn get(&self, key: &str) -> Option<Arc<V>>;

    fn invalidate(&self, key: &str);

    fn invalidate_all(&self);

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// `compute` runs at most once per call and only on a miss.
    fn get_or_compute<E, F>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
        Self: Sized,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = Arc::new(compute()?);
        self.put(key, Arc::clone(&value));
        Ok(value)
    }
}

/// Named cache settings. `0` disables the corresponding limit.
///
/// `max_elements` is exact for the single-lock memory backend. The sharded
/// backend applies `ceil(max_elements / 16)` to each shard, so its total is
/// only bounded by `16 * ceil(max_elements / 16)`; with `max_elements = 5` it
/// may hold up to 16 entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub name: String,
    #[serde(default)]
    pub max_elements: usize,
    #[serde(default)]
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, max_elements: usize, ttl_seconds: u64) -> Self {
        Self {
            name: name.into(),
            max_elements,
            ttl_seconds,
        }
    }
}

/// Cache key for a numeric entity id.
pub fn id_to_key(id: u64) -> String {
    id.to_string()
}

/// FNV-1 32-bit hash of `bytes`; stable across processes and platforms.
pub const fn fnv1_32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811c_9dc5_u32;
    let mut i = 0;

    while i < bytes.len() {
        hash = hash.wrapping_mul(0x0100_0193);
        hash ^= bytes[i] as u32;
        i += 1;
    }

    hash
}
