//! Cache that never stores anything.

use super::Cache;
use std::sync::Arc;

/// Always misses; every `get_or_compute` runs its compute function.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl<V: Send + Sync> Cache<V> for NoOpCache {
    fn put(&self, _key: &str, _value: Arc<V>) -> bool {
        true
    }

    fn get(&self, _key: &str) -> Option<Arc<V>> {
        None
    }

    fn invalidate(&self, _key: &str) {}

    fn invalidate_all(&self) {}
}
