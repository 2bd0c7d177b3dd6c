use log::debug;
use quick_cache::sync::Cache as QuickCache;
use quick_cache::{OptionsBuilder, UnitWeighter};

use crate::cache::{Backend, Cache, CacheStats, Value};
use crate::config::BackendConfig;
use crate::error::{BenchError, Result};

/// `quick_cache::sync::Cache`: sharded CLOCK-Pro, every entry weighs one.
pub struct Quick;

pub struct QuickInstance<V> {
    capacity: u64,
    inner: QuickCache<String, V>,
}

impl Backend for Quick {
    const NAME: &'static str = "quick_cache";

    type Instance<V: Value> = QuickInstance<V>;

    fn build<V: Value>(config: &BackendConfig) -> Result<QuickInstance<V>> {
        config.validate(Self::NAME)?;
        let items = usize::try_from(config.max_entries).map_err(|_| {
            BenchError::construction(
                Self::NAME,
                format!("capacity {} does not fit a usize", config.max_entries),
            )
        })?;
        let options = OptionsBuilder::new()
            .estimated_items_capacity(items)
            .weight_capacity(config.max_entries)
            .shards(config.shards)
            .build()
            .map_err(|err| BenchError::construction(Self::NAME, format!("{err:?}")))?;
        debug!(
            "building {} cache with capacity {} over {} shards",
            Self::NAME,
            config.max_entries,
            config.shards
        );
        let inner = QuickCache::with_options(
            options,
            UnitWeighter,
            Default::default(),
            Default::default(),
        );
        Ok(QuickInstance {
            capacity: config.max_entries,
            inner,
        })
    }
}

impl<V: Value> Cache<V> for QuickInstance<V> {
    fn put(&self, key: String, value: V) {
        self.inner.insert(key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.inner.len() as u64,
            capacity: self.capacity,
        }
    }
}
