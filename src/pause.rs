//! Allocator pause tracking.
//!
//! Rust has no tracing collector, but heavy storms still stall on memory
//! management: every key is a fresh `String`, every eviction frees one, and
//! thousands of workers contend inside the allocator. [`TimedAlloc`] measures
//! that time so it can be reported next to throughput instead of silently
//! being folded into it.

use std::alloc::{GlobalAlloc, Layout, System};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use linked_hash_map::LinkedHashMap;
use log::info;

/// Cumulative allocator activity since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseSnapshot {
    pub pause: Duration,
    pub allocations: u64,
    pub allocated_bytes: u64,
}

/// Allocator activity attributed to one scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseSample {
    pub pause: Duration,
    pub allocations: u64,
    pub allocated_bytes: u64,
}

impl PauseSnapshot {
    /// Activity between `baseline` and `self`, clamped at zero.
    pub fn since(&self, baseline: &PauseSnapshot) -> PauseSample {
        PauseSample {
            pause: self.pause.saturating_sub(baseline.pause),
            allocations: self.allocations.saturating_sub(baseline.allocations),
            allocated_bytes: self.allocated_bytes.saturating_sub(baseline.allocated_bytes),
        }
    }
}

/// Source of cumulative pause figures.
pub trait PauseClock: Send + Sync {
    fn snapshot(&self) -> PauseSnapshot;
}

impl<C: PauseClock + ?Sized> PauseClock for &C {
    fn snapshot(&self) -> PauseSnapshot {
        (**self).snapshot()
    }
}

/// A `GlobalAlloc` over [`System`] that counts calls and times them.
///
/// Install it in the benchmark binary:
/// ```ignore
/// #[global_allocator]
/// static ALLOC: TimedAlloc = TimedAlloc::new();
/// ```
pub struct TimedAlloc {
    pause_nanos: AtomicU64,
    allocations: AtomicU64,
    allocated_bytes: AtomicU64,
    calls: AtomicU64,
    sample_every: AtomicU64,
}

impl TimedAlloc {
    pub const fn new() -> Self {
        TimedAlloc {
            pause_nanos: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            allocated_bytes: AtomicU64::new(0),
            calls: AtomicU64::new(0),
            sample_every: AtomicU64::new(1),
        }
    }

    /// Time one allocator call in `every` and scale it up; `0` stops timing
    /// but keeps counting. Meant to be set once, before anything is measured.
    pub fn set_sample_every(&self, every: u64) {
        self.sample_every.store(every, Ordering::Relaxed);
    }

    #[inline]
    fn timed<T>(&self, op: impl FnOnce() -> T) -> T {
        let every = self.sample_every.load(Ordering::Relaxed);
        if every == 0 || self.calls.fetch_add(1, Ordering::Relaxed) % every != 0 {
            return op();
        }
        let start = Instant::now();
        let out = op();
        let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.pause_nanos
            .fetch_add(nanos.saturating_mul(every), Ordering::Relaxed);
        out
    }

    #[inline]
    fn count(&self, bytes: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

impl Default for TimedAlloc {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for TimedAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.count(layout.size());
        self.timed(|| unsafe { System.alloc(layout) })
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.count(layout.size());
        self.timed(|| unsafe { System.alloc_zeroed(layout) })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.timed(|| unsafe { System.dealloc(ptr, layout) })
    }

    /// Only a growing realloc counts as an allocation, for the bytes it adds.
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if new_size > layout.size() {
            self.count(new_size - layout.size());
        }
        self.timed(|| unsafe { System.realloc(ptr, layout, new_size) })
    }
}

impl PauseClock for TimedAlloc {
    fn snapshot(&self) -> PauseSnapshot {
        PauseSnapshot {
            pause: Duration::from_nanos(self.pause_nanos.load(Ordering::Relaxed)),
            allocations: self.allocations.load(Ordering::Relaxed),
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
        }
    }
}

struct TrackerState {
    started: PauseSnapshot,
    open: HashMap<String, PauseSnapshot>,
    samples: LinkedHashMap<String, PauseSample>,
}

/// Attributes allocator pauses to named scenarios.
///
/// `reset(label)` opens a measured region, `commit(label)` closes it
/// (replacing any earlier sample with that label) and `flush_to` writes the
/// report. Every label keeps its own baseline, so a reset for one scenario
/// never moves the start of another that is still running. Pauses are
/// process-wide: regions that overlap in time both see the allocator
/// activity of the overlap.
pub struct PauseTracker<C> {
    clock: C,
    state: Mutex<TrackerState>,
}

impl<C: PauseClock> PauseTracker<C> {
    pub fn new(clock: C) -> Self {
        let started = clock.snapshot();
        PauseTracker {
            clock,
            state: Mutex::new(TrackerState {
                started,
                open: HashMap::new(),
                samples: LinkedHashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self, label: &str) {
        let baseline = self.clock.snapshot();
        self.lock().open.insert(label.to_string(), baseline);
    }

    /// Delta since `reset(label)`, or since the tracker was created when
    /// `label` was never reset.
    pub fn commit(&self, label: &str) -> PauseSample {
        let now = self.clock.snapshot();
        let mut state = self.lock();
        let baseline = state.open.remove(label).unwrap_or(state.started);
        let sample = now.since(&baseline);
        info!(
            "{}: allocator pause {:?} over {} allocations",
            label, sample.pause, sample.allocations
        );
        state.samples.insert(label.to_string(), sample);
        sample
    }

    pub fn sample(&self, label: &str) -> Option<PauseSample> {
        self.lock().samples.get(label).copied()
    }

    /// Every committed sample, in the order labels were first committed.
    pub fn samples(&self) -> Vec<(String, PauseSample)> {
        self.lock()
            .samples
            .iter()
            .map(|(label, sample)| (label.clone(), *sample))
            .collect()
    }

    /// Write one line per committed sample. Does not clear anything.
    pub fn flush_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let samples = self.samples();
        if samples.is_empty() {
            return Ok(());
        }
        writeln!(out, "allocator pauses:")?;
        for (label, sample) in samples {
            writeln!(
                out,
                "  {:<40} {:>12.3?} {:>12} allocs {:>14} bytes",
                label, sample.pause, sample.allocations, sample.allocated_bytes
            )?;
        }
        out.flush()
    }
}
