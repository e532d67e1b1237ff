//! [`lock_api`] integration.
//!
//! [`RawSpinLock`] implements [`lock_api::RawMutex`], so it can back the
//! generic `lock_api` mutex types and plug into code written against them.

use lock_api::{GuardSend, RawMutex};

use crate::spinlock::RawSpinLock;

/// A `lock_api` mutex backed by [`RawSpinLock`].
pub type Mutex<T> = lock_api::Mutex<RawSpinLock, T>;

/// Guard returned by [`Mutex::lock`](lock_api::Mutex::lock).
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawSpinLock = RawSpinLock::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        self.acquire();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.release();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        RawSpinLock::is_locked(self)
    }
}

/// Bounded acquire for a [`Mutex`]; `None` once the attempt cap is exhausted.
#[inline]
pub fn lock_with_limit<T: ?Sized>(mutex: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    // SAFETY: the guard is only created after the raw lock was acquired.
    unsafe {
        if mutex.raw().acquire_with_limit() {
            Some(mutex.make_guard_unchecked())
        } else {
            None
        }
    }
}
