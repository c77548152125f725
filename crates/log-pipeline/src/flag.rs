// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Boolean state cell for hot-path "is this enabled" checks.
//!
//! Most reads are relaxed loads, which cost the same as a plain load on the
//! common targets. Every `refresh_interval`-th read performed by a thread is
//! an acquire load that pairs with the release store in [`EventuallyVisibleBool::set`],
//! so a reader observes a write from another thread within a bounded number
//! of its own reads. The writing thread always observes its own write on the
//! next read.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Number of reads between acquire loads.
pub const DEFAULT_REFRESH_INTERVAL: u32 = 100;

thread_local! {
    // Shared by every flag read on this thread; only the cadence matters.
    static READS_SINCE_REFRESH: Cell<u32> = const { Cell::new(0) };
}

#[derive(Debug)]
pub struct EventuallyVisibleBool {
    state: AtomicBool,
    /// 1 means every read is an acquire load.
    refresh_interval: u32,
}

impl EventuallyVisibleBool {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self::with_refresh_interval(initial, DEFAULT_REFRESH_INTERVAL)
    }

    /// A flag whose every read synchronizes with the last write.
    #[must_use]
    pub fn synchronized(initial: bool) -> Self {
        Self::with_refresh_interval(initial, 1)
    }

    #[must_use]
    pub fn with_refresh_interval(initial: bool, refresh_interval: u32) -> Self {
        Self {
            state: AtomicBool::new(initial),
            refresh_interval: refresh_interval.max(1),
        }
    }

    pub fn get(&self) -> bool {
        if self.refresh_interval == 1 {
            return self.state.load(Ordering::Acquire);
        }
        let refresh = READS_SINCE_REFRESH.with(|reads| {
            let next = reads.get() + 1;
            if next >= self.refresh_interval {
                reads.set(0);
                true
            } else {
                reads.set(next);
                false
            }
        });
        if refresh {
            self.state.load(Ordering::Acquire)
        } else {
            self.state.load(Ordering::Relaxed)
        }
    }

    pub fn set(&self, value: bool) {
        self.state.store(value, Ordering::Release);
    }

    #[must_use]
    pub fn refresh_interval(&self) -> u32 {
        self.refresh_interval
    }
}
