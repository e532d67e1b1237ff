//! # BackOff
//!
//! A two-tier backoff used by every waiting loop in this crate.
//!
//! Each failed attempt first gives away the rest of the thread's time slice
//! with [`std::thread::yield_now`]. Once a run of consecutive failures reaches
//! the policy's yield limit, the thread sleeps for a short fixed duration
//! instead and the run starts over. Cheap yields keep latency low under light
//! contention; the coarse sleep caps CPU burn when the holder is slow.
//!
//! ## Features
//! - **Tunable policy** via [`BackoffPolicy`] (yield limit, sleep duration,
//!   attempt cap)
//! - **Unbounded waits** with [`BackOff::spin_until`]
//! - **Bounded waits** with [`BackOff::spin_until_bounded`]
//! - **Standalone polling** with [`spin_wait`]
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! use yield_spinlock::spin_wait;
//!
//! let busy = Arc::new(AtomicBool::new(true));
//! let worker = {
//!     let busy = busy.clone();
//!     thread::spawn(move || busy.store(false, Ordering::Release))
//! };
//!
//! // returns once the worker has cleared the flag
//! spin_wait(|| busy.load(Ordering::Acquire));
//! worker.join().unwrap();
//! ```
//!
//! ## Behavior
//! - A [`BackOff`] lives for exactly one wait. It is not shared between
//!   threads and carries no identity past the call that created it.
//! - The attempt cap only matters to [`BackOff::spin_until_bounded`]; it counts
//!   every failed evaluation, including the ones that triggered a sleep.

use core::cell::Cell;
use std::thread;
use std::time::Duration;

/// Consecutive failed attempts before a yield turns into a sleep.
pub const SLEEP_THRESHOLD: u32 = 50;

/// How long to sleep once [`SLEEP_THRESHOLD`] is reached.
pub const SLEEP_DURATION: Duration = Duration::from_millis(1);

/// Failed attempts after which a bounded wait gives up.
pub const MAX_ATTEMPTS: u32 = 200;

/// Tunables shared by every waiting loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Consecutive failures before sleeping instead of yielding.
    pub yield_limit: u32,
    /// Sleep taken when the yield limit is reached.
    pub sleep: Duration,
    /// Total failures a bounded wait tolerates before giving up.
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// The defaults: yield 50 times, then sleep 1ms; give up after 200 failures.
    pub const DEFAULT: BackoffPolicy =
        BackoffPolicy::new(SLEEP_THRESHOLD, SLEEP_DURATION, MAX_ATTEMPTS);

    /// Creates a policy from explicit parameters.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use yield_spinlock::BackoffPolicy;
    ///
    /// let p = BackoffPolicy::new(10, Duration::from_micros(100), 40);
    /// assert_eq!(p.yield_limit, 10);
    /// ```
    #[inline(always)]
    pub const fn new(yield_limit: u32, sleep: Duration, max_attempts: u32) -> Self {
        BackoffPolicy {
            yield_limit,
            sleep,
            max_attempts,
        }
    }

    /// Returns a copy with a different attempt cap.
    #[inline]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-wait backoff state.
///
/// Tracks the current run of consecutive failures (reset on every sleep) and
/// the total number of failures seen by this wait.
///
/// # Examples
///
/// ```rust
/// use yield_spinlock::BackOff;
///
/// let backoff = BackOff::new();
/// let mut tries = 0;
///
/// backoff.spin_until(|| {
///     tries += 1;
///     tries == 3
/// });
/// assert_eq!(backoff.failures(), 2);
/// ```
#[derive(Debug)]
pub struct BackOff {
    policy: BackoffPolicy,
    streak: Cell<u32>,
    failures: Cell<u32>,
}

impl BackOff {
    /// Creates a [`BackOff`] with [`BackoffPolicy::DEFAULT`].
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_policy(BackoffPolicy::DEFAULT)
    }

    /// Creates a [`BackOff`] with a custom policy.
    #[inline(always)]
    pub const fn with_policy(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            streak: Cell::new(0),
            failures: Cell::new(0),
        }
    }

    /// Performs one backoff step after a failed attempt.
    ///
    /// Yields the thread, or, when this failure completes a run of
    /// `yield_limit`, sleeps for `sleep` and restarts the run.
    #[inline]
    pub fn snooze(&self) {
        self.failures.set(self.failures.get().saturating_add(1));

        let streak = self.streak.get() + 1;
        if streak >= self.policy.yield_limit {
            thread::sleep(self.policy.sleep);
            self.streak.set(0);
        } else {
            thread::yield_now();
            self.streak.set(streak);
        }
    }

    /// Evaluates `done` until it returns `true`, backing off after each miss.
    ///
    /// There is no upper bound on the number of attempts.
    #[inline]
    pub fn spin_until(&self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.snooze();
        }
    }

    /// Like [`spin_until`](BackOff::spin_until), but gives up once
    /// `max_attempts` evaluations have failed.
    ///
    /// Returns `true` on the evaluation that succeeds, `false` when the cap is
    /// hit. `done` is always evaluated at least once; the final failure does
    /// not sleep.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use yield_spinlock::{BackOff, BackoffPolicy};
    ///
    /// let backoff = BackOff::with_policy(BackoffPolicy::new(4, Duration::ZERO, 10));
    /// let mut calls = 0;
    /// assert!(!backoff.spin_until_bounded(|| { calls += 1; false }));
    /// assert_eq!(calls, 10);
    /// ```
    #[inline]
    pub fn spin_until_bounded(&self, mut done: impl FnMut() -> bool) -> bool {
        while !done() {
            let failed = self.failures.get().saturating_add(1);
            if failed >= self.policy.max_attempts {
                self.failures.set(failed);
                return false;
            }
            self.snooze();
        }
        true
    }

    /// Failures recorded since creation or the last [`reset`](BackOff::reset).
    #[inline(always)]
    pub fn failures(&self) -> u32 {
        self.failures.get()
    }

    /// Length of the current run of failures since the last sleep.
    #[inline(always)]
    pub fn streak(&self) -> u32 {
        self.streak.get()
    }

    /// The policy this backoff follows.
    #[inline(always)]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Clears both counters.
    #[inline(always)]
    pub fn reset(&self) {
        self.streak.set(0);
        self.failures.set(0);
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` until it returns `false`, using the default policy.
///
/// The predicate is re-evaluated on every iteration and must do its own
/// synchronized read. If it never turns `false` this never returns.
#[inline]
pub fn spin_wait(condition: impl FnMut() -> bool) {
    spin_wait_with(BackoffPolicy::DEFAULT, condition)
}

/// [`spin_wait`] with an explicit policy.
#[inline]
pub fn spin_wait_with(policy: BackoffPolicy, mut condition: impl FnMut() -> bool) {
    BackOff::with_policy(policy).spin_until(|| !condition())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(yield_limit: u32, max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(yield_limit, Duration::ZERO, max_attempts)
    }

    #[test]
    fn default_policy_matches_constants() {
        let p = BackoffPolicy::default();
        assert_eq!(p.yield_limit, 50);
        assert_eq!(p.sleep, Duration::from_millis(1));
        assert_eq!(p.max_attempts, 200);
    }

    /// The run resets every time the yield limit is reached.
    #[test]
    fn streak_resets_at_yield_limit() {
        let b = BackOff::with_policy(fast(5, 0));

        for _ in 0..4 {
            b.snooze();
        }
        assert_eq!(b.streak(), 4);

        b.snooze();
        assert_eq!(b.streak(), 0, "fifth failure should sleep and reset");
        assert_eq!(b.failures(), 5, "sleeping must not forget total failures");

        b.snooze();
        assert_eq!(b.streak(), 1);
    }

    #[test]
    fn reset_clears_counters() {
        let b = BackOff::with_policy(fast(50, 0));
        for _ in 0..7 {
            b.snooze();
        }
        b.reset();
        assert_eq!(b.streak(), 0);
        assert_eq!(b.failures(), 0);
    }

    #[test]
    fn spin_wait_stops_after_exactly_k_evaluations() {
        for k in [1u32, 2, 49, 50, 51, 120] {
            let mut calls = 0;
            spin_wait_with(fast(50, 0), || {
                calls += 1;
                calls < k
            });
            assert_eq!(calls, k);
        }
    }

    #[test]
    fn spin_wait_returns_at_once_on_false() {
        let mut calls = 0;
        spin_wait(|| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
    }

    /// Cap counts total failures, not only the ones that trigger a sleep.
    #[test]
    fn bounded_gives_up_after_cap_total_failures() {
        let b = BackOff::with_policy(fast(50, 200));
        let mut calls = 0;

        assert!(!b.spin_until_bounded(|| {
            calls += 1;
            false
        }));
        assert_eq!(calls, 200);
        assert_eq!(b.failures(), 200);
    }

    #[test]
    fn bounded_succeeds_on_last_allowed_attempt() {
        let b = BackOff::with_policy(fast(3, 10));
        let mut calls = 0;

        assert!(b.spin_until_bounded(|| {
            calls += 1;
            calls == 10
        }));
        assert_eq!(calls, 10);
    }

    #[test]
    fn bounded_zero_cap_still_tries_once() {
        let b = BackOff::with_policy(fast(3, 0));
        let mut calls = 0;

        assert!(!b.spin_until_bounded(|| {
            calls += 1;
            false
        }));
        assert_eq!(calls, 1);

        assert!(BackOff::with_policy(fast(3, 0)).spin_until_bounded(|| true));
    }
}
