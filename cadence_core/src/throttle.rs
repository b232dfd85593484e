// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-domain frame throttling.
//!
//! [`Throttle`] is the single-clock sibling of
//! [`FrameClock`](crate::frame_clock::FrameClock). Every timestamp it accepts
//! or produces lives in the domain chosen at construction, and its default
//! resync restarts the cadence from "now" instead of rounding to a phase.

use alloc::boxed::Box;
use core::fmt;

use crate::clock::ClockSource;
use crate::frame_clock::{ResyncSource, phase_lock};
use crate::time::{ClockId, Duration, TimeError, Timestamp};

/// Steady-cadence deadline generator on one clock.
pub struct Throttle<C> {
    clock: C,
    domain: ClockId,
    period: Duration,
    resync_pending: bool,
    resync_source: Option<Box<dyn ResyncSource>>,
}

impl<C: fmt::Debug> fmt::Debug for Throttle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("clock", &self.clock)
            .field("domain", &self.domain)
            .field("period", &self.period)
            .field("resync_pending", &self.resync_pending)
            .field("custom_resync", &self.resync_source.is_some())
            .finish()
    }
}

impl<C: ClockSource> Throttle<C> {
    /// Creates an unthrottled instance working in `domain`.
    pub fn new(clock: C, domain: ClockId) -> Self {
        Self {
            clock,
            domain,
            period: Duration::ZERO,
            resync_pending: true,
            resync_source: None,
        }
    }

    /// Sets the frame period. Zero disables throttling; negative values are
    /// treated as zero.
    pub fn set_period(&mut self, period: Duration) {
        self.period = if period.is_negative() {
            Duration::ZERO
        } else {
            period
        };
        self.resync_pending = true;
    }

    /// Replaces the reference query. The source must report timestamps in
    /// [`domain`](Self::domain).
    pub fn set_resync_callback(&mut self, source: impl ResyncSource + 'static) {
        self.resync_source = Some(Box::new(source));
        self.resync_pending = true;
    }

    /// Restores the default reference (the current time).
    pub fn reset_resync_callback(&mut self) {
        self.resync_source = None;
        self.resync_pending = true;
    }

    /// Current frame period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The clock domain of every timestamp this throttle handles.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ClockId {
        self.domain
    }

    /// Returns the deadline of the frame following `previous`.
    ///
    /// Fails with [`TimeError::ClockDomainMismatch`] if `previous` or the
    /// resync reference is not in [`domain`](Self::domain).
    pub fn next_frame_after(&mut self, previous: Timestamp) -> Result<Timestamp, TimeError> {
        self.check_domain(previous)?;
        if self.period.is_zero() {
            return Ok(previous);
        }

        let target = previous + self.period;
        let now = self.clock.now(self.domain)?;
        if !self.resync_pending && !target.is_before(now)? {
            return Ok(target);
        }

        let reference = match &mut self.resync_source {
            Some(source) => source.resync(),
            None => now,
        };
        self.check_domain(reference)?;
        let target = phase_lock(reference, now, self.period)?;
        self.resync_pending = false;
        Ok(target)
    }

    fn check_domain(&self, t: Timestamp) -> Result<(), TimeError> {
        if t.domain() == self.domain {
            Ok(())
        } else {
            Err(TimeError::ClockDomainMismatch {
                left: t.domain(),
                right: self.domain,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use super::*;
    use crate::clock::ManualClock;

    const P: Duration = Duration(1_000);
    const HW: ClockId = ClockId(0x100);

    fn mono(ticks: i64) -> Timestamp {
        Timestamp::new(ClockId::MONOTONIC, ticks)
    }

    fn throttle(clock: &Rc<ManualClock>) -> Throttle<Rc<ManualClock>> {
        let mut t = Throttle::new(Rc::clone(clock), ClockId::MONOTONIC);
        t.set_period(P);
        t
    }

    #[test]
    fn first_frame_starts_one_period_from_now() {
        let clock = Rc::new(ManualClock::new(10_250));
        let mut t = throttle(&clock);
        assert_eq!(t.next_frame_after(mono(3)), Ok(mono(11_250)));
    }

    #[test]
    fn steady_cadence_then_restart_after_stall() {
        let clock = Rc::new(ManualClock::new(10_000));
        let mut t = throttle(&clock);

        let a = t.next_frame_after(mono(10_000)).unwrap();
        clock.advance(Duration(400));
        let b = t.next_frame_after(a).unwrap();
        assert_eq!(b, a + P);

        // Stalled past b + P: restart from now rather than catching up.
        clock.set(15_730);
        let c = t.next_frame_after(b).unwrap();
        assert_eq!(c, mono(16_730));
    }

    #[test]
    fn zero_period_is_pass_through() {
        let clock = Rc::new(ManualClock::new(0));
        let mut t = Throttle::new(Rc::clone(&clock), ClockId::MONOTONIC);
        assert_eq!(t.next_frame_after(mono(99)), Ok(mono(99)));
        t.set_period(Duration(-1));
        assert_eq!(t.period(), Duration::ZERO);
    }

    #[test]
    fn foreign_previous_is_rejected() {
        let clock = Rc::new(ManualClock::new(0));
        let mut t = throttle(&clock);
        assert_eq!(
            t.next_frame_after(Timestamp::new(HW, 0)),
            Err(TimeError::ClockDomainMismatch {
                left: HW,
                right: ClockId::MONOTONIC,
            })
        );
    }

    #[test]
    fn foreign_reference_is_rejected() {
        let clock = Rc::new(ManualClock::new(5_000));
        let mut t = throttle(&clock);
        t.set_resync_callback(|| Timestamp::new(HW, 4_000));
        assert!(matches!(
            t.next_frame_after(mono(5_000)),
            Err(TimeError::ClockDomainMismatch { left: HW, .. })
        ));

        t.reset_resync_callback();
        assert_eq!(t.next_frame_after(mono(5_000)), Ok(mono(6_000)));
    }

    #[test]
    fn custom_reference_sets_the_phase() {
        let clock = Rc::new(ManualClock::new(5_000));
        let mut t = throttle(&clock);
        t.set_resync_callback(|| mono(4_300));
        assert_eq!(t.domain(), ClockId::MONOTONIC);
        assert_eq!(t.next_frame_after(mono(5_000)), Ok(mono(5_300)));
    }
}
