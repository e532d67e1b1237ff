//! # Contention benchmark
//!
//! Spawns a pool of workers that hammer one shared counter through a lock,
//! waits for all of them, and reports the final count and wall-clock time.
//! Every run takes its lock and configuration as arguments, so runs never
//! share state with each other.

use std::fmt;
use std::sync::{Mutex as StdMutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::spinlock::SpinLock;

/// A counter guarded by some lock.
///
/// Each [`increment`](CounterLock::increment) is one acquire, mutate, release
/// cycle.
pub trait CounterLock: Sync {
    /// Name printed in reports.
    fn label(&self) -> &'static str;

    fn increment(&self);

    fn value(&self) -> u64;
}

impl CounterLock for SpinLock<u64> {
    fn label(&self) -> &'static str {
        "SpinLock"
    }

    #[inline]
    fn increment(&self) {
        *self.lock() += 1;
    }

    fn value(&self) -> u64 {
        *self.lock()
    }
}

#[cfg(feature = "lock_api")]
impl CounterLock for crate::mutex::Mutex<u64> {
    fn label(&self) -> &'static str {
        "lock_api::Mutex<RawSpinLock>"
    }

    #[inline]
    fn increment(&self) {
        *self.lock() += 1;
    }

    fn value(&self) -> u64 {
        *self.lock()
    }
}

impl CounterLock for StdMutex<u64> {
    fn label(&self) -> &'static str {
        "std::sync::Mutex"
    }

    #[inline]
    fn increment(&self) {
        *self.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn value(&self) -> u64 {
        *self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub label: &'static str,
    pub counter: u64,
    pub expected: u64,
    pub elapsed: Duration,
}

impl BenchReport {
    /// Whether no increment was lost.
    pub fn is_consistent(&self) -> bool {
        self.counter == self.expected
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {:?}", self.label, self.counter, self.elapsed)
    }
}

/// Runs `config.workers` threads, each incrementing `lock` `config.iterations`
/// times, and joins them all before reading the counter.
pub fn run<L: CounterLock>(config: &BenchConfig, lock: &L) -> Result<BenchReport, BenchError> {
    config.validate()?;
    debug!(
        "{}: {} workers x {} iterations",
        lock.label(),
        config.workers,
        config.iterations
    );

    let iterations = config.iterations;
    let start = Instant::now();
    let panicked = thread::scope(|s| {
        let handles: Vec<_> = (0..config.workers)
            .map(|_| {
                s.spawn(move || {
                    for _ in 0..iterations {
                        lock.increment();
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join())
            .filter(Result::is_err)
            .count()
    });
    let elapsed = start.elapsed();

    if panicked > 0 {
        return Err(BenchError::WorkerPanicked(panicked));
    }

    let report = BenchReport {
        label: lock.label(),
        counter: lock.value(),
        expected: config.expected(),
        elapsed,
    };
    if !report.is_consistent() {
        warn!(
            "{}: lost updates, counter {} != expected {}",
            report.label, report.counter, report.expected
        );
    }
    Ok(report)
}

/// Runs every contender once, each with a fresh zeroed counter.
pub fn run_all(config: &BenchConfig) -> Result<Vec<BenchReport>, BenchError> {
    let mut reports = vec![run(config, &SpinLock::new(0u64))?];
    #[cfg(feature = "lock_api")]
    reports.push(run(config, &crate::mutex::Mutex::new(0u64))?);
    reports.push(run(config, &StdMutex::new(0u64))?);
    Ok(reports)
}
