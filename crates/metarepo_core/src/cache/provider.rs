//! Backend selection and named cache configuration.

use super::{Cache, CacheConfig, MemoryCache, NoOpCache, ShardedMemoryCache};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Which memory backend configured caches use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheProvider {
    #[default]
    Memory,
    Sharded,
}

impl CacheProvider {
    pub fn new_cache<V>(self, config: CacheConfig) -> ConfiguredCache<V> {
        match self {
            Self::Memory => ConfiguredCache::Memory(MemoryCache::new(config)),
            Self::Sharded => ConfiguredCache::Sharded(ShardedMemoryCache::new(config)),
        }
    }
}

/// A cache built from configuration.
#[derive(Debug)]
pub enum ConfiguredCache<V> {
    Memory(MemoryCache<V>),
    Sharded(ShardedMemoryCache<V>),
    NoOp(NoOpCache),
}

impl<V> ConfiguredCache<V> {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp(_))
    }
}

impl<V: Send + Sync> Cache<V> for ConfiguredCache<V> {
    fn put(&self, key: &str, value: Arc<V>) -> bool {
        match self {
            Self::Memory(cache) => cache.put(key, value),
            Self::Sharded(cache) => cache.put(key, value),
            Self::NoOp(cache) => Cache::<V>::put(cache, key, value),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        match self {
            Self::Memory(cache) => cache.get(key),
            Self::Sharded(cache) => cache.get(key),
            Self::NoOp(cache) => Cache::<V>::get(cache, key),
        }
    }

    fn invalidate(&self, key: &str) {
        match self {
            Self::Memory(cache) => cache.invalidate(key),
            Self::Sharded(cache) => cache.invalidate(key),
            Self::NoOp(cache) => Cache::<V>::invalidate(cache, key),
        }
    }

    fn invalidate_all(&self) {
        match self {
            Self::Memory(cache) => cache.invalidate_all(),
            Self::Sharded(cache) => cache.invalidate_all(),
            Self::NoOp(cache) => Cache::<V>::invalidate_all(cache),
        }
    }
}

/// Named cache configurations and the backend used to build them.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    provider: CacheProvider,
    configs: RwLock<BTreeMap<String, CacheConfig>>,
}

impl CacheRegistry {
    pub fn new(provider: CacheProvider) -> Self {
        Self {
            provider,
            configs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn provider(&self) -> CacheProvider {
        self.provider
    }

    /// Registers or replaces the config stored under `config.name`.
    pub fn register(&self, config: CacheConfig) {
        info!(
            "event=cache_register module=cache status=ok name={} max_elements={} ttl_seconds={}",
            config.name, config.max_elements, config.ttl_seconds
        );
        self.configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.name.clone(), config);
    }

    pub fn config(&self, name: &str) -> Option<CacheConfig> {
        self.configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Builds the cache configured as `name`, or a no-op cache when no such
    /// config is registered.
    pub fn named_cache<V>(&self, name: &str) -> ConfiguredCache<V> {
        match self.config(name) {
            Some(config) => self.provider.new_cache(config),
            None => {
                debug!("event=cache_build module=cache status=fallback name={name} backend=noop");
                ConfiguredCache::NoOp(NoOpCache)
            }
        }
    }

    /// Builds a cache from a caller supplied config.
    pub fn custom_cache<V>(&self, config: CacheConfig) -> ConfiguredCache<V> {
        self.provider.new_cache(config)
    }
}
