pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pause;
pub mod payload;
pub mod workload;

pub use crate::cache::{Backend, Cache, CacheStats, Value};
pub use crate::cache::{Lru, Moka, MokaSegmented, Quick};
pub use crate::catalog::{Scenario, CATALOG};
pub use crate::config::HarnessConfig;
pub use crate::error::{BenchError, Result};
pub use crate::pause::{PauseClock, PauseTracker, TimedAlloc};
