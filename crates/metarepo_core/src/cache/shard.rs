//! One lock-guarded partition of a memory cache.

use super::CacheConfig;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Stored value plus the instant it was put.
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.stored_at) >= ttl)
    }
}

/// Expiry and size limits applied by one shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryPolicy {
    pub ttl: Option<Duration>,
    pub capacity: Option<usize>,
}

impl EntryPolicy {
    /// Policy for a cache split into `shards` partitions.
    pub fn from_config(config: &CacheConfig, shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            ttl: (config.ttl_seconds > 0).then(|| Duration::from_secs(config.ttl_seconds)),
            capacity: (config.max_elements > 0).then(|| config.max_elements.div_ceil(shards)),
        }
    }
}

#[derive(Debug)]
pub struct CacheShard<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    policy: EntryPolicy,
    /// Last full expiry sweep; only touched under the entries write lock.
    last_sweep: Mutex<Instant>,
}

impl<V> CacheShard<V> {
    pub fn new(policy: EntryPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Stores `value`; at most once per TTL period this also drops every
    /// expired entry, so unread keys do not accumulate.
    pub fn add(&self, key: &str, value: Arc<V>) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(ttl) = self.policy.ttl {
            let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            if now.duration_since(*last_sweep) >= ttl {
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired(Some(ttl), now));
                *last_sweep = now;
                debug!(
                    "event=cache_sweep module=cache status=ok purged={}",
                    before - entries.len()
                );
            }
        }

        if let Some(capacity) = self.policy.capacity {
            if !entries.contains_key(key) && entries.len() >= capacity {
                self.make_room(&mut entries, capacity, now);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    /// Live value for `key`; an expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(self.policy.ttl, now) => {
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.policy.ttl, now))
        {
            entries.remove(key);
        }
        None
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn remove_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(&self, entries: &mut HashMap<String, CacheEntry<V>>, capacity: usize, now: Instant) {
        let ttl = self.policy.ttl;
        entries.retain(|_, entry| !entry.is_expired(ttl, now));

        while entries.len() >= capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            entries.remove(&oldest);
            debug!("event=cache_evict module=cache status=ok key={oldest}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheShard, EntryPolicy};
    use crate::cache::CacheConfig;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn policy_splits_capacity_across_shards() {
        let policy = EntryPolicy::from_config(&CacheConfig::new("c", 100, 5), 16);
        assert_eq!(policy.capacity, Some(7));
        assert_eq!(policy.ttl, Some(Duration::from_secs(5)));

        let unlimited = EntryPolicy::from_config(&CacheConfig::new("c", 0, 0), 16);
        assert_eq!(unlimited, EntryPolicy::default());
    }

    #[test]
    fn full_shard_evicts_oldest_entry() {
        let shard = CacheShard::new(EntryPolicy {
            ttl: None,
            capacity: Some(2),
        });
        shard.add("a", Arc::new(1));
        thread::sleep(Duration::from_millis(2));
        shard.add("b", Arc::new(2));
        thread::sleep(Duration::from_millis(2));
        shard.add("c", Arc::new(3));

        assert_eq!(shard.len(), 2);
        assert!(shard.get("a").is_none());
        assert_eq!(shard.get("c").as_deref(), Some(&3));
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let shard = CacheShard::new(EntryPolicy {
            ttl: None,
            capacity: Some(2),
        });
        shard.add("a", Arc::new(1));
        shard.add("b", Arc::new(2));
        shard.add("b", Arc::new(3));
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.get("a").as_deref(), Some(&1));
    }

    #[test]
    fn expired_entry_is_a_miss_and_purged() {
        let shard = CacheShard::new(EntryPolicy {
            ttl: Some(Duration::from_millis(10)),
            capacity: None,
        });
        shard.add("a", Arc::new("v"));
        assert!(shard.get("a").is_some());
        thread::sleep(Duration::from_millis(20));
        assert!(shard.get("a").is_none());
        assert!(shard.is_empty());
    }

    #[test]
    fn add_sweeps_expired_entries_that_are_never_read() {
        let shard = CacheShard::new(EntryPolicy {
            ttl: Some(Duration::from_millis(10)),
            capacity: None,
        });
        shard.add("a", Arc::new(1));
        shard.add("b", Arc::new(2));
        thread::sleep(Duration::from_millis(20));

        shard.add("c", Arc::new(3));
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get("c").as_deref(), Some(&3));
    }
}
