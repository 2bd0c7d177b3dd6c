//! The canonical access patterns.
//!
//! Every function here only drives a [`Cache`]; building the instance, timing
//! and pause bookkeeping belong to the catalog. Iteration counts come from the
//! benchmarking facility.

use std::hint::black_box;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::cache::{Cache, Value};
use crate::error::Result;
use crate::payload::PayloadSource;

/// The key of the `i`-th entry of a workload.
#[inline]
pub fn key(i: u64) -> String {
    i.to_string()
}

/// `put(i, payload(i))` for every `i` in `0..n`.
pub fn sequential_put<C, P>(cache: &C, n: u64, payload: &P) -> Result<()>
where
    C: Cache<P::Value>,
    P: PayloadSource,
{
    for i in 0..n {
        cache.put(key(i), payload.produce(i)?);
    }
    Ok(())
}

/// Seed keys `0..n` ahead of a read workload.
pub fn populate<C, P>(cache: &C, n: u64, payload: &P) -> Result<()>
where
    C: Cache<P::Value>,
    P: PayloadSource,
{
    sequential_put(cache, n, payload)
}

/// Read the same key `n` times; returns how many reads hit.
pub fn repeated_get<V, C>(cache: &C, key: &str, n: u64) -> u64
where
    V: Value,
    C: Cache<V>,
{
    let mut hits = 0;
    for _ in 0..n {
        if black_box(cache.get(black_box(key))).is_some() {
            hits += 1;
        }
    }
    hits
}

/// Read `n` distinct keys that were never written; returns how many hit.
pub fn missing_get<V, C>(cache: &C, n: u64) -> u64
where
    V: Value,
    C: Cache<V>,
{
    let mut hits = 0;
    for i in 0..n {
        if black_box(cache.get(&key(i))).is_some() {
            hits += 1;
        }
    }
    hits
}

/// `n * factor` sequential puts, far beyond any configured capacity.
pub fn churn<C, P>(cache: &C, n: u64, factor: u64, payload: &P) -> Result<()>
where
    C: Cache<P::Value>,
    P: PayloadSource,
{
    sequential_put(cache, n.saturating_mul(factor), payload)
}

/// How a storm is spread over the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Logical workers; each runs its whole job exactly once.
    pub workers: usize,
    /// Upper bound on OS threads the workers are multiplexed onto.
    pub threads: usize,
}

impl FanOut {
    fn thread_count(&self) -> usize {
        self.threads.clamp(1, self.workers.max(1))
    }
}

/// Run `work(worker)` for every worker index and return the wall time from
/// the moment all threads are released until the last one finishes.
///
/// Threads are spawned before the clock starts and wait on a shared barrier.
/// A panicking worker takes the whole storm down with it; the first worker
/// error is returned once every thread has been joined.
pub fn storm<F>(fan_out: &FanOut, work: F) -> Result<Duration>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let threads = fan_out.thread_count();
    debug!("storm of {} workers on {} threads", fan_out.workers, threads);

    let workers = fan_out.workers;
    let next = AtomicUsize::new(0);
    let start_line = Barrier::new(threads + 1);
    let (next, start_line, work) = (&next, &start_line, &work);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || -> Result<()> {
                    start_line.wait();
                    loop {
                        let worker = next.fetch_add(1, Ordering::Relaxed);
                        if worker >= workers {
                            return Ok(());
                        }
                        work(worker)?;
                    }
                })
            })
            .collect();

        start_line.wait();
        let start = Instant::now();
        let mut outcome = Ok(());
        for handle in handles {
            match handle.join() {
                Ok(result) => {
                    if outcome.is_ok() {
                        outcome = result;
                    }
                }
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        let elapsed = start.elapsed();
        outcome.map(|()| elapsed)
    })
}

/// Every worker reads keys `i % key_range` for `i` in `0..ops`.
pub fn heavy_read<V, C>(
    cache: &C,
    fan_out: &FanOut,
    ops: u64,
    key_range: u64,
) -> Result<Duration>
where
    V: Value,
    C: Cache<V>,
{
    let key_range = key_range.max(1);
    storm(fan_out, |_| {
        for i in 0..ops {
            black_box(cache.get(&key(i % key_range)));
        }
        Ok(())
    })
}

/// Worker `w` writes its own range `w * ops .. (w + 1) * ops`, so no two
/// workers ever write the same key.
pub fn heavy_write<C, P>(
    cache: &C,
    fan_out: &FanOut,
    ops: u64,
    payload: &P,
) -> Result<Duration>
where
    C: Cache<P::Value>,
    P: PayloadSource,
{
    storm(fan_out, |worker| {
        let base = worker as u64 * ops;
        for i in base..base + ops {
            cache.put(key(i), payload.produce(i)?);
        }
        Ok(())
    })
}
