use crate::config::BackendConfig;
use crate::error::Result;

/// CacheStats is a point-in-time view of a cache instance.
///
/// `size` is exact for lock-based backends and an estimate for backends that
/// apply writes asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: u64,
    pub capacity: u64,
}

/// Anything a benchmark can store: shared between workers, cloned out on reads.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// Cache trait is the single capability set every backend is driven through.
///
/// A workload written against this trait runs unmodified on every backend:
/// ```
/// use cachebench::{Backend, Cache, Lru, Moka};
/// use cachebench::config::BackendConfig;
///
/// fn round_trip<B: Backend>() {
///     let cache = B::build::<u64>(&BackendConfig::default()).unwrap();
///     cache.put("7".to_string(), 7);
///     assert_eq!(cache.get("7"), Some(7));
/// }
///
/// round_trip::<Lru>();
/// round_trip::<Moka>();
/// ```
pub trait Cache<V: Value>: Send + Sync {
    /// Insert or overwrite `key`. The backend may evict something else.
    fn put(&self, key: String, value: V);
    fn get(&self, key: &str) -> Option<V>;
    fn stats(&self) -> CacheStats;
}

/// A cache library under comparison.
///
/// Implemented by zero-sized markers so scenarios pick a backend at compile
/// time; `Instance` is the adapter wrapping the library's native handle.
pub trait Backend {
    const NAME: &'static str;

    type Instance<V: Value>: Cache<V>;

    /// Build a fresh, empty instance. Fails when the configuration is invalid
    /// for this backend; callers must not fall back to defaults.
    fn build<V: Value>(config: &BackendConfig) -> Result<Self::Instance<V>>;
}

pub mod lru_cache;
pub mod moka_cache;
pub mod quick;
pub mod segmented;

pub use lru_cache::Lru;
pub use moka_cache::Moka;
pub use quick::Quick;
pub use segmented::MokaSegmented;
