//! # yield-spinlock
//!
//! A user-space spinlock built on one atomic word, with a two-tier backoff
//! that trades CPU burn for latency under contention.
//!
//! The crate includes:
//!
//! - [`RawSpinLock`]: the bare acquire/release protocol, including a bounded
//!   acquire that gives up after a fixed number of failed attempts.
//! - [`SpinLock<T>`]: a data-owning spinlock with an RAII [`SpinGuard`].
//! - [`BackOff`] and [`BackoffPolicy`]: yield on every miss, sleep after a
//!   long run of misses.
//! - [`spin_wait`]: the same backoff applied to an arbitrary predicate.
//! - [`bench`]: a harness comparing the spinlock against blocking mutexes.
//!
//! Waiting threads never enter an OS blocking call; they yield their time
//! slice and, once contention has lasted a while, sleep for a millisecond.
//!
//! ## Quick Example
//!
//! ```rust
//! use yield_spinlock::{RawSpinLock, SpinLock};
//!
//! let lock = SpinLock::new(0);
//! {
//!     let mut guard = lock.lock();
//!     *guard += 1;
//! } // released here
//! assert_eq!(*lock.lock(), 1);
//!
//! let raw = RawSpinLock::new();
//! raw.acquire();
//! assert!(!raw.try_acquire());
//! raw.release();
//! assert!(raw.try_acquire());
//! ```
//!
//! ## Usage Notes
//!
//! - The lock is neither fair nor reentrant, and does not poison.
//! - Keep critical sections short.
//! - A failed [`RawSpinLock::acquire_with_limit`] leaves the lock untouched;
//!   do not release after it.
//!
//! ## Feature flags
//! - **`lock_api`** (default): implements [`lock_api::RawMutex`] for
//!   [`RawSpinLock`] and exports the [`Mutex`] alias.

pub mod backoff;
pub mod bench;
pub mod config;
pub mod error;
pub mod flag;
#[cfg(feature = "lock_api")]
pub mod mutex;
pub mod spinlock;

pub use backoff::{spin_wait, spin_wait_with, BackOff, BackoffPolicy};
pub use error::BenchError;
pub use flag::{AtomicFlag, State};
#[cfg(feature = "lock_api")]
pub use mutex::{Mutex, MutexGuard};
pub use spinlock::{RawSpinLock, SpinGuard, SpinLock};
