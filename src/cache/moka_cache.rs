use log::debug;
use moka::sync::Cache as MokaCache;

use crate::cache::{Backend, Cache, CacheStats, Value};
use crate::config::BackendConfig;
use crate::error::Result;

/// `moka::sync::Cache`: concurrent, TinyLFU admission, per-entry time-to-live.
///
/// Moka chooses its own segmentation so the shard count is only validated.
pub struct Moka;

pub struct MokaInstance<V> {
    capacity: u64,
    inner: MokaCache<String, V>,
}

impl Backend for Moka {
    const NAME: &'static str = "moka";

    type Instance<V: Value> = MokaInstance<V>;

    fn build<V: Value>(config: &BackendConfig) -> Result<MokaInstance<V>> {
        config.validate(Self::NAME)?;
        debug!(
            "building {} cache with capacity {} and ttl {:?}",
            Self::NAME,
            config.max_entries,
            config.ttl
        );
        let inner = MokaCache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Ok(MokaInstance {
            capacity: config.max_entries,
            inner,
        })
    }
}

impl<V: Value> Cache<V> for MokaInstance<V> {
    fn put(&self, key: String, value: V) {
        self.inner.insert(key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    /// Flushes moka's pending maintenance first so the count reflects evictions.
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
    fn test_moka_conformance() {
        conformance::put_then_get::<Moka>();
        conformance::misses_on_unseeded_keys::<Moka>();
        conformance::stays_within_capacity::<Moka>();
        conformance::rejects_invalid_config::<Moka>();
        conformance::rejects_overlong_ttl::<Moka>();
    }
}
