use log::debug;
use moka::sync::SegmentedCache;

use crate::cache::{Backend, Cache, CacheStats, Value};
use crate::config::BackendConfig;
use crate::error::Result;

/// `moka::sync::SegmentedCache`: one moka cache per shard, each with its own
/// lock-free map and maintenance queue.
pub struct MokaSegmented;

pub struct SegmentedInstance<V> {
    capacity: u64,
    inner: SegmentedCache<String, V>,
}

impl Backend for MokaSegmented {
    const NAME: &'static str = "moka_segmented";

    type Instance<V: Value> = SegmentedInstance<V>;

    fn build<V: Value>(config: &BackendConfig) -> Result<SegmentedInstance<V>> {
        config.validate(Self::NAME)?;
        debug!(
            "building {} cache with capacity {} over {} segments",
            Self::NAME,
            config.max_entries,
            config.shards
        );
        let inner = SegmentedCache::builder(config.shards)
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Ok(SegmentedInstance {
            capacity: config.max_entries,
            inner,
        })
    }
}

impl<V: Value> Cache<V> for SegmentedInstance<V> {
    fn put(&self, key: String, value: V) {
        self.inner.insert(key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            size: self.inner.entry_count(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::conformance;

    #[test]
    fn test_segmented_conformance() {
        conformance::put_then_get::<MokaSegmented>();
        conformance::misses_on_unseeded_keys::<MokaSegmented>();
        conformance::stays_within_capacity::<MokaSegmented>();
        conformance::rejects_invalid_config::<MokaSegmented>();
        conformance::rejects_overlong_ttl::<MokaSegmented>();
    }

    #[test]
    fn test_segmented_reports_capacity() {
        let cache = MokaSegmented::build::<u64>(&BackendConfig::default()).unwrap();
        cache.put("1".to_string(), 1);
        let stats = cache.stats();
        assert_eq!(stats.capacity, BackendConfig::default().max_entries);
        assert_eq!(stats.size, 1);
    }
}
