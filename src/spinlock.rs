//! # SpinLock
//!
//! A user-space mutual exclusion primitive that never asks the OS to block.
//! Waiters poll a single [`AtomicFlag`] and back off with the two-tier
//! [`BackOff`] policy: yield the time slice on every miss, sleep briefly after
//! a long run of misses.
//!
//! Two layers are provided:
//! - [`RawSpinLock`]: the bare acquire/release protocol. It protects nothing
//!   by itself; callers bracket their own shared state with it.
//! - [`SpinLock<T>`]: owns the data and hands out a [`SpinGuard`] that
//!   releases on drop.
//!
//! ## Semantics
//! - **Not fair.** Acquisition order among waiters is unspecified and a thread
//!   can starve under adversarial scheduling.
//! - **Not reentrant.** Acquiring twice from the same thread deadlocks.
//! - **No poisoning.** A panic while holding a [`SpinGuard`] still releases.
//! - Only [`RawSpinLock::acquire_with_limit`] and
//!   [`SpinLock::lock_with_limit`] can give up; nothing else is cancellable.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use yield_spinlock::SpinLock;
//!
//! let counter = Arc::new(SpinLock::new(0u64));
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let counter = counter.clone();
//!         thread::spawn(move || {
//!             for _ in 0..1000 {
//!                 *counter.lock() += 1;
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(*counter.lock(), 4000);
//! ```

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use log::trace;

use crate::backoff::{BackOff, BackoffPolicy};
use crate::flag::{AtomicFlag, State};

/// The raw acquire/release protocol over one [`AtomicFlag`].
///
/// `Free -> Held` only through a successful compare-and-swap,
/// `Held -> Free` only through a release store.
#[derive(Debug)]
pub struct RawSpinLock {
    flag: AtomicFlag,
    policy: BackoffPolicy,
}

impl RawSpinLock {
    /// Creates an unlocked lock with [`BackoffPolicy::DEFAULT`].
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_policy(BackoffPolicy::DEFAULT)
    }

    /// Creates an unlocked lock that waits according to `policy`.
    #[inline(always)]
    pub const fn with_policy(policy: BackoffPolicy) -> Self {
        RawSpinLock {
            flag: AtomicFlag::new(),
            policy,
        }
    }

    /// Makes exactly one attempt to take the lock. Never blocks.
    #[inline(always)]
    pub fn try_acquire(&self) -> bool {
        self.flag.compare_and_swap(State::Free, State::Held)
    }

    /// Takes the lock, waiting as long as it takes.
    ///
    /// Blocks forever if the holder never releases.
    #[inline]
    pub fn acquire(&self) {
        BackOff::with_policy(self.policy).spin_until(|| self.try_acquire());
    }

    /// Takes the lock unless `max_attempts` consecutive attempts fail.
    ///
    /// Returns `false` without touching the lock when the cap is hit; the
    /// caller must not [`release`](RawSpinLock::release) in that case.
    #[inline]
    pub fn acquire_with_limit(&self) -> bool {
        let backoff = BackOff::with_policy(self.policy);
        let acquired = backoff.spin_until_bounded(|| self.try_acquire());
        if !acquired {
            trace!("bounded acquire gave up after {} attempts", backoff.failures());
        }
        acquired
    }

    /// Marks the lock free.
    ///
    /// Must only be called by whoever last acquired it. Releasing a lock you
    /// do not hold is not detected and breaks mutual exclusion for every other
    /// user of this lock.
    #[inline(always)]
    pub fn release(&self) {
        self.flag.store(State::Free);
    }

    /// Whether the lock is currently held. Racy; for diagnostics only.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.flag.load() == State::Held
    }

    /// The backoff policy used while waiting.
    #[inline(always)]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A spinlock that owns the data it protects.
///
/// See the [module-level documentation](self) for semantics.
pub struct SpinLock<T: ?Sized> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

/// Exclusive access to the data of a [`SpinLock`]. Releases on drop.
pub struct SpinGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
}

impl<T> SpinLock<T> {
    /// Creates a new unlocked [`SpinLock`] wrapping `data`.
    ///
    /// # Example
    /// ```
    /// use yield_spinlock::SpinLock;
    ///
    /// let lock = SpinLock::new(123);
    /// assert_eq!(*lock.lock(), 123);
    /// ```
    #[inline(always)]
    pub const fn new(data: T) -> Self {
        Self::with_policy(data, BackoffPolicy::DEFAULT)
    }

    /// Creates a new unlocked [`SpinLock`] with a custom backoff policy.
    #[inline(always)]
    pub const fn with_policy(data: T, policy: BackoffPolicy) -> Self {
        SpinLock {
            raw: RawSpinLock::with_policy(policy),
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes the lock and returns the data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquires the lock, backing off until it becomes available.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.raw.acquire();
        SpinGuard { lock: self }
    }

    /// Attempts the lock exactly once.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.raw.try_acquire() {
            Some(SpinGuard { lock: self })
        } else {
            None
        }
    }

    /// Acquires the lock unless the policy's attempt cap is exhausted first.
    #[inline]
    pub fn lock_with_limit(&self) -> Option<SpinGuard<'_, T>> {
        if self.raw.acquire_with_limit() {
            Some(SpinGuard { lock: self })
        } else {
            None
        }
    }

    /// Runs a closure with exclusive access to the data.
    ///
    /// # Example
    /// ```
    /// use yield_spinlock::SpinLock;
    ///
    /// let lock = SpinLock::new(0i32);
    /// let seen = lock.with_lock(|data| {
    ///     *data += 1;
    ///     *data
    /// });
    /// assert_eq!(seen, 1);
    /// ```
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Whether the lock is currently held.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Mutable access without locking; the borrow proves exclusivity.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// The underlying raw lock.
    #[inline(always)]
    pub fn raw(&self) -> &RawSpinLock {
        &self.raw
    }

    /// Releases the lock without a guard.
    ///
    /// # Safety
    /// The caller must hold the lock through a guard that was leaked with
    /// [`core::mem::forget`], and must not touch that guard again.
    #[inline]
    pub unsafe fn force_unlock(&self) {
        self.raw.release();
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.release();
    }
}

impl<T: ?Sized> Deref for SpinGuard<'_, T> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinGuard<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the lock is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

// SAFETY: access to `data` is serialized by `raw`.
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}
unsafe impl<T: ?Sized + Sync> Sync for SpinGuard<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(50, Duration::ZERO, max_attempts)
    }

    #[test]
    fn test_basic_lock_unlock() {
        let lock = SpinLock::new(10);

        {
            let mut guard = lock.lock();
            *guard += 5;
            assert_eq!(*guard, 15);
        }

        assert!(!lock.is_locked(), "Lock should be released after guard drop");
    }

    #[test]
    fn test_handoff_scenario() {
        let lock = RawSpinLock::new();

        // A acquires immediately
        lock.acquire();
        assert!(lock.is_locked());

        // B fails while A holds it
        assert!(!lock.try_acquire());
        assert!(lock.is_locked());

        lock.release();
        assert!(!lock.is_locked());

        // B now succeeds
        assert!(lock.try_acquire());
        assert!(lock.is_locked());
    }

    #[test]
    fn test_try_acquire_single_winner() {
        for _ in 0..20 {
            let lock = RawSpinLock::new();
            let barrier = Barrier::new(8);
            let wins = AtomicUsize::new(0);

            thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        barrier.wait();
                        if lock.try_acquire() {
                            wins.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                }
            });

            assert_eq!(wins.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn test_concurrent_access() {
        let lock = Arc::new(SpinLock::new(0usize));
        let mut handles = vec![];

        for _ in 0..8 {
            let lock_cloned = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    let mut guard = lock_cloned.lock();
                    *guard += 1;
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*lock.lock(), 8 * 10_000, "Counter should match total increments");
    }

    #[test]
    fn test_bounded_acquire_on_held_lock() {
        let lock = RawSpinLock::with_policy(fast_policy(200));
        assert!(lock.try_acquire());

        assert!(!lock.acquire_with_limit());
        assert!(lock.is_locked(), "Failed bounded acquire must not touch the state");

        lock.release();
        assert!(lock.acquire_with_limit());
        assert!(lock.is_locked());
    }

    #[test]
    fn test_bounded_acquire_default_policy_terminates() {
        let lock = SpinLock::new(());
        let _held = lock.lock();

        // default policy: 200 attempts with a 1ms sleep every 50
        assert!(lock.lock_with_limit().is_none());
    }

    #[test]
    fn test_bounded_acquire_waits_for_release() {
        // generous cap so the holder always releases in time
        let policy = BackoffPolicy::new(50, Duration::from_millis(1), 100_000);
        let lock = SpinLock::with_policy(0u32, policy);
        let guard = lock.lock();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                lock.lock_with_limit().map(|mut g| {
                    *g += 1;
                    *g
                })
            });
            thread::sleep(Duration::from_millis(5));
            drop(guard);
            assert_eq!(waiter.join().unwrap(), Some(1));
        });
    }

    #[test]
    fn test_release_publishes_writes() {
        let lock = RawSpinLock::new();
        let payload = AtomicUsize::new(0);

        lock.acquire();
        thread::scope(|s| {
            let reader = s.spawn(|| {
                lock.acquire();
                let seen = payload.load(Ordering::Relaxed);
                lock.release();
                seen
            });

            payload.store(42, Ordering::Relaxed);
            lock.release();
            assert_eq!(reader.join().unwrap(), 42);
        });
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let lock = Arc::new(SpinLock::new(0));
        let cloned = lock.clone();
        let _ = thread::spawn(move || {
            let _guard = cloned.lock();
            panic!("boom");
        })
        .join();

        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_force_unlock_after_forget() {
        let lock = SpinLock::new(1);
        core::mem::forget(lock.lock());
        assert!(lock.is_locked());

        unsafe { lock.force_unlock() };
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_get_mut_and_into_inner() {
        let mut lock = SpinLock::new(String::from("a"));
        lock.get_mut().push('b');
        assert_eq!(lock.into_inner(), "ab");
    }
}
