//! # AtomicFlag
//!
//! The single machine word every lock in this crate is built on. It only
//! knows two values, [`State::Free`] and [`State::Held`], and only two ways to
//! change them: a compare-and-swap and an unconditional store.
//!
//! A successful [`AtomicFlag::compare_and_swap`] synchronizes-with the
//! [`AtomicFlag::store`] that preceded it, so everything written before a
//! release is visible to the next successful acquirer.

use core::sync::atomic::{
    AtomicU32,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
};

/// The two legal values of an [`AtomicFlag`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Free = 0,
    Held = 1,
}

impl State {
    #[inline(always)]
    const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => State::Free,
            _ => State::Held,
        }
    }
}

/// An atomic two-state word.
#[derive(Debug)]
pub struct AtomicFlag {
    word: AtomicU32,
}

impl AtomicFlag {
    /// Creates a flag in the [`State::Free`] state.
    #[inline(always)]
    pub const fn new() -> Self {
        AtomicFlag {
            word: AtomicU32::new(State::Free as u32),
        }
    }

    /// Sets the flag to `new` iff it currently holds `expected`.
    ///
    /// Returns whether the swap happened. Never blocks.
    #[inline(always)]
    pub fn compare_and_swap(&self, expected: State, new: State) -> bool {
        self.word
            .compare_exchange(expected as u32, new as u32, AcqRel, Relaxed)
            .is_ok()
    }

    /// Unconditionally writes `state` with release ordering.
    #[inline(always)]
    pub fn store(&self, state: State) {
        self.word.store(state as u32, Release);
    }

    /// Reads the current state. Only a snapshot; it may be stale immediately.
    #[inline(always)]
    pub fn load(&self) -> State {
        State::from_raw(self.word.load(Acquire))
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new()
    }
}
