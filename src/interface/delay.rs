// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blocking millisecond delays.
//!
//! Every wait in the driver goes through [`DelayMs`] so the poll loops can be
//! driven by a fake clock in tests.

use std::{thread, time::Duration};

/// Millisecond delay
pub trait DelayMs {
    /// Pauses execution for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Delay source backed by `thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TimerMs;

impl DelayMs for TimerMs {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}
