//! Every benchmark the harness knows about.
//!
//! A [`Scenario`] binds one backend, one access pattern and one payload. The
//! table is fixed at build time; ordering carries no meaning because every
//! run builds its own cache instance.

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;

use crate::cache::{Backend, Lru, Moka, MokaSegmented, Quick};
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::pause::{PauseClock, PauseTracker};
use crate::payload::{self, EncodedRecord, Fixed, PayloadSource, Record, Tiny};
use crate::workload::{self, FanOut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Moka,
    MokaSegmented,
    QuickCache,
    Lru,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Moka,
        BackendKind::MokaSegmented,
        BackendKind::QuickCache,
        BackendKind::Lru,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Moka => Moka::NAME,
            BackendKind::MokaSegmented => MokaSegmented::NAME,
            BackendKind::QuickCache => Quick::NAME,
            BackendKind::Lru => Lru::NAME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Sequential puts of fresh keys.
    Put,
    /// The same pre-populated key, read over and over.
    Get,
    /// Distinct keys that were never written.
    GetMiss,
    /// Far more sequential puts than the cache can hold.
    Churn,
    /// Concurrent workers re-reading a shared pre-populated range.
    HeavyRead,
    /// Concurrent workers writing disjoint key ranges.
    HeavyWrite,
}

impl Pattern {
    pub fn name(self) -> &'static str {
        match self {
            Pattern::Put => "put",
            Pattern::Get => "get",
            Pattern::GetMiss => "get_miss",
            Pattern::Churn => "churn",
            Pattern::HeavyRead => "heavy_read",
            Pattern::HeavyWrite => "heavy_write",
        }
    }

    pub fn is_storm(self) -> bool {
        matches!(self, Pattern::HeavyRead | Pattern::HeavyWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    Int,
    Small,
    Large,
    Object,
    EncodedObject,
}

impl Payload {
    pub fn name(self) -> &'static str {
        match self {
            Payload::Int => "int",
            Payload::Small => "1k",
            Payload::Large => "1m",
            Payload::Object => "object",
            Payload::EncodedObject => "object_encoded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scenario {
    pub backend: BackendKind,
    pub pattern: Pattern,
    pub payload: Payload,
}

macro_rules! suite {
    ($($backend:ident),* $(,)?) => {
        &[$(
            Scenario::new(BackendKind::$backend, Pattern::Put, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::Get, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::GetMiss, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::Put, Payload::Small),
            Scenario::new(BackendKind::$backend, Pattern::Put, Payload::Large),
            Scenario::new(BackendKind::$backend, Pattern::Put, Payload::Object),
            Scenario::new(BackendKind::$backend, Pattern::Put, Payload::EncodedObject),
            Scenario::new(BackendKind::$backend, Pattern::Churn, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::HeavyRead, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::HeavyWrite, Payload::Int),
            Scenario::new(BackendKind::$backend, Pattern::HeavyWrite, Payload::Small),
        )*]
    };
}

pub static CATALOG: &[Scenario] = suite!(Moka, MokaSegmented, QuickCache, Lru);

impl Scenario {
    pub const fn new(backend: BackendKind, pattern: Pattern, payload: Payload) -> Self {
        Scenario {
            backend,
            pattern,
            payload,
        }
    }

    /// Backend-independent name, e.g. `heavy_write_1k`.
    pub fn workload(&self) -> String {
        format!("{}_{}", self.pattern.name(), self.payload.name())
    }

    /// Cache operations performed per benchmark iteration.
    pub fn ops_per_iter(&self, config: &HarnessConfig) -> u64 {
        let workers = config.storm.workers as u64;
        match self.pattern {
            Pattern::Put | Pattern::Get | Pattern::GetMiss => 1,
            Pattern::Churn => config.churn_factor,
            Pattern::HeavyRead => workers.saturating_mul(config.storm.read_ops),
            Pattern::HeavyWrite => workers.saturating_mul(config.storm.write_ops),
        }
    }

    /// Run `iters` iterations on a freshly built cache and return the time
    /// spent in the measured region only. Storm scenarios also commit their
    /// allocator pauses to `tracker` under this scenario's name.
    pub fn run<C: PauseClock>(
        &self,
        iters: u64,
        config: &HarnessConfig,
        tracker: &PauseTracker<C>,
    ) -> Result<Duration> {
        debug!("running {} for {} iterations", self, iters);
        match self.backend {
            BackendKind::Moka => self.with_payload::<Moka, C>(iters, config, tracker),
            BackendKind::MokaSegmented => {
                self.with_payload::<MokaSegmented, C>(iters, config, tracker)
            }
            BackendKind::QuickCache => self.with_payload::<Quick, C>(iters, config, tracker),
            BackendKind::Lru => self.with_payload::<Lru, C>(iters, config, tracker),
        }
    }

    fn with_payload<B: Backend, C: PauseClock>(
        &self,
        iters: u64,
        config: &HarnessConfig,
        tracker: &PauseTracker<C>,
    ) -> Result<Duration> {
        match self.payload {
            Payload::Int => self.drive::<B, _, C>(iters, config, tracker, &Tiny),
            Payload::Small => {
                self.drive::<B, _, C>(iters, config, tracker, &Fixed(payload::small()))
            }
            Payload::Large => {
                self.drive::<B, _, C>(iters, config, tracker, &Fixed(payload::large()))
            }
            Payload::Object => self.drive::<B, _, C>(iters, config, tracker, &Record),
            Payload::EncodedObject => {
                self.drive::<B, _, C>(iters, config, tracker, &EncodedRecord)
            }
        }
    }

    fn drive<B: Backend, P: PayloadSource, C: PauseClock>(
        &self,
        iters: u64,
        config: &HarnessConfig,
        tracker: &PauseTracker<C>,
        payload: &P,
    ) -> Result<Duration> {
        let cache = B::build::<P::Value>(&config.backend)?;
        let storm = &config.storm;
        let fan_out = FanOut {
            workers: storm.workers,
            threads: storm.threads,
        };

        match self.pattern {
            Pattern::Put => timed(|| workload::sequential_put(&cache, iters, payload)),
            Pattern::Get => {
                workload::populate(&cache, 1, payload)?;
                timed(|| {
                    workload::repeated_get::<P::Value, _>(&cache, "0", iters);
                    Ok(())
                })
            }
            Pattern::GetMiss => timed(|| {
                workload::missing_get::<P::Value, _>(&cache, iters);
                Ok(())
            }),
            Pattern::Churn => {
                timed(|| workload::churn(&cache, iters, config.churn_factor, payload))
            }
            Pattern::HeavyRead => {
                workload::populate(&cache, storm.key_range, payload)?;
                self.tracked(tracker, || {
                    repeat(iters, || {
                        workload::heavy_read::<P::Value, _>(
                            &cache,
                            &fan_out,
                            storm.read_ops,
                            storm.key_range,
                        )
                    })
                })
            }
            Pattern::HeavyWrite => self.tracked(tracker, || {
                repeat(iters, || {
                    workload::heavy_write(&cache, &fan_out, storm.write_ops, payload)
                })
            }),
        }
    }

    fn tracked<C: PauseClock>(
        &self,
        tracker: &PauseTracker<C>,
        op: impl FnOnce() -> Result<Duration>,
    ) -> Result<Duration> {
        let label = self.to_string();
        tracker.reset(&label);
        let elapsed = op()?;
        tracker.commit(&label);
        Ok(elapsed)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}/{}",
            self.pattern.name(),
            self.payload.name(),
            self.backend.name()
        )
    }
}

fn timed(op: impl FnOnce() -> Result<()>) -> Result<Duration> {
    let start = Instant::now();
    op()?;
    Ok(start.elapsed())
}

fn repeat(iters: u64, mut storm: impl FnMut() -> Result<Duration>) -> Result<Duration> {
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        total += storm()?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, StormConfig};
    use crate::error::BenchError;
    use crate::pause::TimedAlloc;
    use std::collections::HashSet;

    fn small_config() -> HarnessConfig {
        HarnessConfig {
            backend: BackendConfig::default(),
            storm: StormConfig {
                workers: 8,
                threads: 2,
                read_ops: 32,
                write_ops: 32,
                key_range: 16,
            },
            churn_factor: 4,
            pause_sample_every: 1,
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<String> = CATALOG.iter().map(|s| s.to_string()).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_every_backend_runs_every_workload() {
        let workloads: HashSet<String> = CATALOG.iter().map(|s| s.workload()).collect();
        assert_eq!(workloads.len(), 11);
        for backend in BackendKind::ALL {
            let count = CATALOG.iter().filter(|s| s.backend == backend).count();
            assert_eq!(count, workloads.len(), "{}", backend.name());
        }
    }

    #[test]
    fn test_scenario_naming() {
        let scenario =
            Scenario::new(BackendKind::QuickCache, Pattern::HeavyWrite, Payload::Small);
        assert_eq!(scenario.workload(), "heavy_write_1k");
        assert_eq!(scenario.to_string(), "heavy_write_1k/quick_cache");
    }

    #[test]
    fn test_ops_per_iter() {
        let config = small_config();
        let put = Scenario::new(BackendKind::Lru, Pattern::Put, Payload::Int);
        let churn = Scenario::new(BackendKind::Lru, Pattern::Churn, Payload::Int);
        let write = Scenario::new(BackendKind::Lru, Pattern::HeavyWrite, Payload::Int);
        assert_eq!(put.ops_per_iter(&config), 1);
        assert_eq!(churn.ops_per_iter(&config), 4);
        assert_eq!(write.ops_per_iter(&config), 8 * 32);
    }

    #[test]
    fn test_whole_catalog_runs() {
        let config = small_config();
        let tracker = PauseTracker::new(TimedAlloc::new());
        for scenario in CATALOG {
            scenario
                .run(2, &config, &tracker)
                .unwrap_or_else(|err| panic!("{scenario}: {err}"));
        }

        let tracked: Vec<String> = tracker
            .samples()
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        let storms: Vec<String> = CATALOG
            .iter()
            .filter(|s| s.pattern.is_storm())
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tracked, storms);
    }

    #[test]
    fn test_invalid_config_aborts_scenario() {
        let mut config = small_config();
        config.backend.shards = 3;
        let tracker = PauseTracker::new(TimedAlloc::new());
        let scenario = Scenario::new(BackendKind::Moka, Pattern::HeavyWrite, Payload::Int);
        let err = scenario.run(1, &config, &tracker).unwrap_err();
        assert!(matches!(err, BenchError::Construction { backend: "moka", .. }));
        assert!(tracker.samples().is_empty());
    }
}
