//! Benchmark parameters.
//!
//! The defaults match the established comparison suites: 10 000 storm
//! workers, 1024 reads or 8192 writes each, a 1024-key read range and a churn
//! of 1024 puts per iteration. Every knob can be overridden from the
//! environment so CI can run the storms at a fraction of their size.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{BenchError, Result};

pub const DEFAULT_SHARDS: usize = 256;
pub const DEFAULT_MAX_ENTRIES: u64 = 8192;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);
/// Longest time-to-live moka's builders accept.
pub const MAX_TTL: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);
pub const DEFAULT_MAX_ENTRY_SIZE: usize = 1024;

pub const CHURN_FACTOR: u64 = 1024;

pub const STORM_WORKERS: usize = 10_000;
pub const HEAVY_READ_OPS: u64 = 1024;
pub const HEAVY_WRITE_OPS: u64 = 8192;
pub const READ_KEY_RANGE: u64 = 1024;

/// Time every allocator call by default, the most aggressive setting.
pub const PAUSE_SAMPLE_EVERY: u64 = 1;

/// Construction parameters handed to every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub shards: usize,
    pub max_entries: u64,
    pub ttl: Duration,
    /// Expected upper bound of a single value in bytes. Only a hint: no
    /// backend refuses larger values.
    pub max_entry_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            shards: DEFAULT_SHARDS,
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

impl BackendConfig {
    /// Reject configurations that at least one backend cannot honour, so
    /// that every backend in a comparison runs under the same parameters.
    pub fn validate(&self, backend: &'static str) -> Result<()> {
        if self.shards == 0 || !self.shards.is_power_of_two() {
            return Err(BenchError::construction(
                backend,
                format!("shard count {} is not a power of two", self.shards),
            ));
        }
        if self.max_entries < self.shards as u64 {
            return Err(BenchError::construction(
                backend,
                format!(
                    "capacity {} is smaller than the shard count {}",
                    self.max_entries, self.shards
                ),
            ));
        }
        if self.ttl.is_zero() {
            return Err(BenchError::construction(backend, "time-to-live is zero"));
        }
        if self.ttl > MAX_TTL {
            return Err(BenchError::construction(
                backend,
                format!("time-to-live {:?} exceeds {:?}", self.ttl, MAX_TTL),
            ));
        }
        if self.max_entry_size == 0 {
            return Err(BenchError::construction(backend, "max entry size is zero"));
        }
        Ok(())
    }
}

/// Shape of the concurrent storm scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StormConfig {
    /// Logical workers per storm.
    pub workers: usize,
    /// OS threads the workers are multiplexed onto.
    pub threads: usize,
    pub read_ops: u64,
    pub write_ops: u64,
    /// Keys pre-populated before a heavy-read storm and re-read by every worker.
    pub key_range: u64,
}

impl Default for StormConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(4, |n| n.get());
        StormConfig {
            workers: STORM_WORKERS,
            threads: cores * 4,
            read_ops: HEAVY_READ_OPS,
            write_ops: HEAVY_WRITE_OPS,
            key_range: READ_KEY_RANGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub backend: BackendConfig,
    pub storm: StormConfig,
    pub churn_factor: u64,
    pub pause_sample_every: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            backend: BackendConfig::default(),
            storm: StormConfig::default(),
            churn_factor: CHURN_FACTOR,
            pause_sample_every: PAUSE_SAMPLE_EVERY,
        }
    }
}

impl HarnessConfig {
    /// Defaults with `CACHEBENCH_*` overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults with overrides taken from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HarnessConfig::default();
        let read = Overrides { lookup: &lookup };

        read.apply("CACHEBENCH_SHARDS", &mut config.backend.shards)?;
        read.apply("CACHEBENCH_MAX_ENTRIES", &mut config.backend.max_entries)?;
        if let Some(secs) = read.get::<u64>("CACHEBENCH_TTL_SECS")? {
            config.backend.ttl = Duration::from_secs(secs);
        }
        read.apply("CACHEBENCH_WORKERS", &mut config.storm.workers)?;
        read.apply("CACHEBENCH_THREADS", &mut config.storm.threads)?;
        read.apply("CACHEBENCH_READ_OPS", &mut config.storm.read_ops)?;
        read.apply("CACHEBENCH_WRITE_OPS", &mut config.storm.write_ops)?;
        read.apply("CACHEBENCH_KEY_RANGE", &mut config.storm.key_range)?;
        read.apply("CACHEBENCH_CHURN_FACTOR", &mut config.churn_factor)?;
        read.apply("CACHEBENCH_PAUSE_SAMPLE", &mut config.pause_sample_every)?;

        if config.storm.threads == 0 {
            return Err(BenchError::Config {
                name: "CACHEBENCH_THREADS",
                value: "0".to_string(),
                reason: "at least one thread is required".to_string(),
            });
        }
        Ok(config)
    }
}

struct Overrides<'a, F> {
    lookup: &'a F,
}

impl<F> Overrides<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get<T>(&self, name: &'static str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = (self.lookup)(name) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| BenchError::Config {
                name,
                value: raw.clone(),
                reason: err.to_string(),
            })
    }

    fn apply<T>(&self, name: &'static str, slot: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(name)? {
            *slot = value;
        }
        Ok(())
    }
}
