use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use lru::LruCache;

use crate::cache::{Backend, Cache, CacheStats, Value};
use crate::config::BackendConfig;
use crate::error::{BenchError, Result};

/// The `lru` crate, which is single-threaded, behind one `Mutex`.
///
/// The crate has no expiry, so the configured time-to-live is ignored, and no
/// sharding: every worker in a storm contends on the same lock.
pub struct Lru;

pub struct LruInstance<V> {
    capacity: u64,
    inner: Mutex<LruCache<String, V>>,
}

impl<V> LruInstance<V> {
    fn lock(&self) -> MutexGuard<'_, LruCache<String, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for Lru {
    const NAME: &'static str = "lru";

    type Instance<V: Value> = LruInstance<V>;

    fn build<V: Value>(config: &BackendConfig) -> Result<LruInstance<V>> {
        config.validate(Self::NAME)?;
        let capacity = usize::try_from(config.max_entries)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                BenchError::construction(
                    Self::NAME,
                    format!("capacity {} does not fit a non-zero usize", config.max_entries),
                )
            })?;
        debug!("building {} cache with capacity {}", Self::NAME, capacity);
        Ok(LruInstance {
            capacity: config.max_entries,
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }
}

impl<V: Value> Cache<V> for LruInstance<V> {
    fn put(&self, key: String, value: V) {
        self.lock().put(key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.lock().len() as u64,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::conformance;

    #[test]
    fn test_lru_conformance() {
        conformance::put_then_get::<Lru>();
        conformance::misses_on_unseeded_keys::<Lru>();
        conformance::stays_within_capacity::<Lru>();
        conformance::rejects_invalid_config::<Lru>();
        conformance::rejects_overlong_ttl::<Lru>();
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        let config = BackendConfig {
            shards: 1,
            max_entries: 2,
            ..BackendConfig::default()
        };
        let cache = Lru::build::<u64>(&config).unwrap();
        cache.put("1".to_string(), 1);
        cache.put("2".to_string(), 2);
        assert_eq!(cache.get("1"), Some(1));
        cache.put("3".to_string(), 3);
        assert_eq!(cache.get("2"), None);
        assert_eq!(cache.get("1"), Some(1));
        assert_eq!(cache.get("3"), Some(3));
        assert_eq!(cache.stats(), CacheStats { size: 2, capacity: 2 });
    }
}
