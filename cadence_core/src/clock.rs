// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock sources.
//!
//! [`ClockSource`] is the seam between pacing code and the operating system:
//! it is the only way pacing code reads the current time. Platform crates
//! implement it (e.g. `cadence_posix::PosixClock`); [`ManualClock`] is a
//! deterministic implementation for tests and simulations.

use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::Cell;

use crate::time::{ClockId, Duration, TimeError, Timestamp};

/// Reads the current time of a clock domain.
pub trait ClockSource {
    /// Returns the current time of `domain`.
    ///
    /// Fails with [`TimeError::UnsupportedClock`] if this source cannot read
    /// `domain`.
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError>;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
        (**self).now(domain)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Rc<C> {
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
        (**self).now(domain)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
        (**self).now(domain)
    }
}

/// A hand-driven clock.
///
/// Every domain reads the same tick value. Time only moves when
/// [`advance`](Self::advance) or [`set`](Self::set) is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: Cell<i64>,
}

impl ManualClock {
    /// Creates a clock reading `ticks` nanoseconds in every domain.
    #[must_use]
    pub const fn new(ticks: i64) -> Self {
        Self {
            ticks: Cell::new(ticks),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.ticks.set(self.ticks.get() + by.as_nanos());
    }

    /// Jumps the clock to `ticks` nanoseconds.
    pub fn set(&self, ticks: i64) {
        self.ticks.set(ticks);
    }

    /// Current tick value.
    #[must_use]
    pub fn ticks(&self) -> i64 {
        self.ticks.get()
    }
}

impl ClockSource for ManualClock {
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
        Ok(Timestamp::new(domain, self.ticks.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reads_in_requested_domain() {
        let clock = ManualClock::new(500);
        let mono = clock.now(ClockId::MONOTONIC).unwrap();
        let hw = clock.now(ClockId(42)).unwrap();
        assert_eq!(mono, Timestamp::new(ClockId::MONOTONIC, 500));
        assert_eq!(hw.domain(), ClockId(42));

        clock.advance(Duration(250));
        assert_eq!(clock.ticks(), 750);
        clock.set(10);
        assert_eq!((&clock).now(ClockId::REALTIME).unwrap().ticks(), 10);
    }
}
