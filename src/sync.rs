// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::{Condvar, Mutex};

/// Counting semaphore.
///
/// Unlike a guard-based primitive, acquire and release are independent calls,
/// so a permit can be taken in one call frame and returned in another.
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Mutex::new(capacity.max(1)),
            cond: Condvar::new(),
        }
    }

    /// Takes a permit, blocking while none is available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().expect("lock is poisoned");

        while *permits == 0 {
            permits = self.cond.wait(permits).expect("lock is poisoned");
        }

        *permits -= 1;
    }

    /// Returns a permit.
    pub fn release(&self) {
        let mut permits = self.permits.lock().expect("lock is poisoned");
        *permits += 1;
        self.cond.notify_one();
    }
}

#[derive(Default)]
struct RwState {
    readers: usize,
    writer: bool,
}

/// Read/write lock whose acquire and release are detached calls.
///
/// Lock entries outlive any single call frame (a lock taken by
/// `lock_identifier` is released by a later `unlock_identifier`), so the
/// guard-based `std::sync::RwLock` does not fit here.
#[derive(Default)]
pub(crate) struct RawRwLock {
    state: Mutex<RwState>,
    cond: Condvar,
}

impl RawRwLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no writer holds the lock, then registers a reader.
    pub fn lock_shared(&self) {
        let mut state = self.state.lock().expect("lock is poisoned");

        while state.writer {
            state = self.cond.wait(state).expect("lock is poisoned");
        }

        state.readers += 1;
    }

    pub fn unlock_shared(&self) {
        let mut state = self.state.lock().expect("lock is poisoned");
        state.readers = state.readers.saturating_sub(1);

        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    /// Blocks until the lock is free of readers and writers, then takes it.
    pub fn lock_exclusive(&self) {
        let mut state = self.state.lock().expect("lock is poisoned");

        while state.writer || state.readers > 0 {
            state = self.cond.wait(state).expect("lock is poisoned");
        }

        state.writer = true;
    }

    pub fn unlock_exclusive(&self) {
        let mut state = self.state.lock().expect("lock is poisoned");
        state.writer = false;
        self.cond.notify_all();
    }
}
