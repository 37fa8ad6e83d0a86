// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::{atomic::AtomicBool, Arc};

/// Cancellation handle shared between the registry and its polling loops.
///
/// Cloning yields another handle to the same signal. Once sent, the signal
/// stays set for the lifetime of the registry.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Fires the signal.
    pub fn send(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Release);
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }
}
