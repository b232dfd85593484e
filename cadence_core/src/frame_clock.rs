// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Phase-locked frame deadlines.
//!
//! [`FrameClock`] answers one question per frame: given the deadline of the
//! frame just rendered, when should the next one be due? In the steady state
//! the answer is simply `previous + period`, which keeps every client that
//! renders faster than the display in lockstep with it.
//!
//! When a deadline has already passed (a slow frame, or an idle gap), or after
//! reconfiguration, the clock asks a [`ResyncSource`] for a reference point
//! that is known to lie on the display's phase, typically the last vblank.
//! The next deadline is then the first phase-aligned point after "now". This
//! drops missed frames instead of bursting to catch up.
//!
//! The reference may live in a different clock domain than `previous`
//! (hardware vblank clocks often do). That domain then becomes authoritative:
//! all later deadlines are produced in it.

use alloc::boxed::Box;
use core::fmt;

use crate::clock::ClockSource;
use crate::time::{ClockId, Duration, TimeError, Timestamp};
use crate::trace::{FrameDeadlineEvent, ResyncEvent, Tracer};

/// Produces a reference timestamp that lies on the display's phase.
///
/// Implemented for every `FnMut() -> Timestamp` closure.
pub trait ResyncSource {
    /// Returns a timestamp known to be phase-aligned, such as the last vblank.
    fn resync(&mut self) -> Timestamp;
}

impl<F: FnMut() -> Timestamp> ResyncSource for F {
    fn resync(&mut self) -> Timestamp {
        self()
    }
}

/// Deadline generator that stays phase-locked to the display refresh.
pub struct FrameClock<C> {
    clock: C,
    period: Duration,
    resync_pending: bool,
    /// `None` selects the quantized clock read.
    resync_source: Option<Box<dyn ResyncSource>>,
    fallback_domain: ClockId,
}

impl<C: fmt::Debug> fmt::Debug for FrameClock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("clock", &self.clock)
            .field("period", &self.period)
            .field("resync_pending", &self.resync_pending)
            .field("custom_resync", &self.resync_source.is_some())
            .field("fallback_domain", &self.fallback_domain)
            .finish()
    }
}

impl<C: ClockSource> FrameClock<C> {
    /// Creates an unthrottled clock (period zero) reading time from `clock`.
    ///
    /// The first deadline after a period is set always resyncs.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            period: Duration::ZERO,
            resync_pending: true,
            resync_source: None,
            fallback_domain: ClockId::MONOTONIC,
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

    /// Replaces the reference query used when the clock resyncs.
    pub fn set_resync_callback(&mut self, source: impl ResyncSource + 'static) {
        self.resync_source = Some(Box::new(source));
        self.resync_pending = true;
    }

    /// Restores the default reference: the current time, rounded down to a
    /// multiple of the period.
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

    /// Whether the next deadline will consult the resync source
    /// unconditionally.
    #[inline]
    #[must_use]
    pub fn resync_pending(&self) -> bool {
        self.resync_pending
    }

    /// The underlying clock source.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the deadline of the frame following `previous`.
    ///
    /// Fails if the clock source cannot read a required domain.
    pub fn next_frame_after(&mut self, previous: Timestamp) -> Result<Timestamp, TimeError> {
        self.next_frame_after_traced(previous, &mut Tracer::none())
    }

    /// Same as [`next_frame_after`](Self::next_frame_after), reporting resyncs
    /// and deadlines to `tracer`.
    pub fn next_frame_after_traced(
        &mut self,
        previous: Timestamp,
        tracer: &mut Tracer<'_>,
    ) -> Result<Timestamp, TimeError> {
        if self.period.is_zero() {
            return Ok(previous);
        }

        let mut target = previous + self.period;
        let now = self.clock.now(target.domain())?;
        let resynced = self.resync_pending || target.is_before(now)?;

        if resynced {
            self.fallback_domain = target.domain();
            let reference = self.query_reference()?;
            let now = self.clock.now(reference.domain())?;
            tracer.resync(&ResyncEvent {
                previous,
                reference,
                now,
            });
            target = phase_lock(reference, now, self.period)?;
            self.resync_pending = false;
        }

        tracer.frame_deadline(&FrameDeadlineEvent {
            previous,
            target,
            resynced,
        });
        Ok(target)
    }

    fn query_reference(&mut self) -> Result<Timestamp, TimeError> {
        if let Some(source) = &mut self.resync_source {
            return Ok(source.resync());
        }
        let now = self.clock.now(self.fallback_domain)?;
        let phase = now.ticks().rem_euclid(self.period.as_nanos());
        Ok(now - Duration(phase))
    }
}

/// Returns the first point on `reference`'s phase that lies after `now`, or
/// `reference` itself if it is still in the future.
///
/// `period` must be positive.
pub(crate) fn phase_lock(
    reference: Timestamp,
    now: Timestamp,
    period: Duration,
) -> Result<Timestamp, TimeError> {
    if reference.is_after(now)? {
        return Ok(reference);
    }
    let age = now.checked_since(reference)?.div_floor(period);
    Ok(reference + period * (age + 1))
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::clock::ManualClock;

    const P: Duration = Duration(10_000_000);
    const T0: i64 = 100 * 10_000_000;
    const HW: ClockId = ClockId(0x100);

    fn mono(ticks: i64) -> Timestamp {
        Timestamp::new(ClockId::MONOTONIC, ticks)
    }

    fn clock_at_t0() -> Rc<ManualClock> {
        Rc::new(ManualClock::new(T0))
    }

    fn frame_clock(clock: &Rc<ManualClock>) -> FrameClock<Rc<ManualClock>> {
        let mut fc = FrameClock::new(Rc::clone(clock));
        fc.set_period(P);
        fc
    }

    fn since(later: Timestamp, earlier: Timestamp) -> Duration {
        later.checked_since(earlier).unwrap()
    }

    #[test]
    fn zero_period_passes_previous_through() {
        let clock = clock_at_t0();
        let mut fc = FrameClock::new(Rc::clone(&clock));
        assert_eq!(fc.period(), Duration::ZERO);
        let prev = mono(42);
        assert_eq!(fc.next_frame_after(prev), Ok(prev));
        assert!(fc.resync_pending(), "pass-through must not consume the resync");
    }

    #[test]
    fn negative_period_is_clamped_to_zero() {
        let clock = clock_at_t0();
        let mut fc = FrameClock::new(Rc::clone(&clock));
        fc.set_period(Duration(-5));
        assert_eq!(fc.period(), Duration::ZERO);
        assert_eq!(fc.next_frame_after(mono(7)), Ok(mono(7)));
    }

    #[test]
    fn fast_render_advances_by_one_period() {
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);

        let a = mono(T0);
        let b = fc.next_frame_after(a).unwrap();
        assert_eq!(b, mono(T0) + P);

        clock.advance(Duration(P.0 / 2));
        let c = fc.next_frame_after(b).unwrap();
        assert_eq!(since(c, b), P);
    }

    #[test]
    fn slow_frame_skips_to_next_phase_point() {
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);

        let b = fc.next_frame_after(mono(T0 - 3)).unwrap();
        assert_eq!(b, mono(T0) + P);

        // Late, but still before c's deadline.
        clock.advance(Duration(P.0 * 3 / 2));
        let c = fc.next_frame_after(b).unwrap();
        assert_eq!(since(c, b), P);

        // Misses c + P, so one frame is dropped.
        clock.advance(Duration(P.0 * 16 / 10));
        let d = fc.next_frame_after(c).unwrap();
        assert_eq!(since(d, c), P * 2);

        // Back to steady state.
        clock.advance(Duration(P.0 / 4));
        let e = fc.next_frame_after(d).unwrap();
        assert_eq!(since(e, d), P);
    }

    #[test]
    fn idle_gap_resumes_within_one_period() {
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);

        let b = fc.next_frame_after(mono(T0)).unwrap();
        clock.advance(Duration(P.0 * 103 / 10));
        let now = mono(clock.ticks());

        let c = fc.next_frame_after(b).unwrap();
        assert_eq!(c.is_after(now), Ok(true));
        assert!(since(c, now) <= P, "deadline must be at most one period away");
        assert_eq!(c, mono(T0) + P * 11);
    }

    #[test]
    fn identical_clocks_stay_in_lockstep() {
        let clock = clock_at_t0();
        let mut left = frame_clock(&clock);
        let mut right = frame_clock(&clock);

        let mut l = left.next_frame_after(mono(T0 - 1)).unwrap();
        let mut r = right.next_frame_after(mono(T0 - 1)).unwrap();
        assert_eq!(l, r);

        for step in [3, 17, 4, 25, 9, 1, 30] {
            clock.advance(Duration(P.0 * step / 10));
            l = left.next_frame_after(l).unwrap();
            r = right.next_frame_after(r).unwrap();
            assert_eq!(l, r, "clocks diverged after a {step}/10 period step");
        }
    }

    #[test]
    fn steady_state_never_resyncs_and_reconfiguration_resyncs_once() {
        let clock = clock_at_t0();
        let calls = Rc::new(Cell::new(0_u32));
        let mut fc = frame_clock(&clock);
        {
            let calls = Rc::clone(&calls);
            let clock = Rc::clone(&clock);
            fc.set_resync_callback(move || {
                calls.set(calls.get() + 1);
                mono(clock.ticks() - clock.ticks().rem_euclid(P.0))
            });
        }

        let mut deadline = fc.next_frame_after(mono(T0)).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(!fc.resync_pending(), "first deadline consumes the resync");

        for _ in 0..20 {
            clock.advance(Duration(P.0 * 9 / 10));
            deadline = fc.next_frame_after(deadline).unwrap();
        }
        assert_eq!(calls.get(), 1, "steady state must not query the reference");

        fc.set_period(P);
        assert!(fc.resync_pending(), "set_period must force a resync");
        deadline = fc.next_frame_after(deadline).unwrap();
        _ = fc.next_frame_after(deadline).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn new_resync_source_is_queried_once_on_the_next_deadline() {
        const SHIFT: i64 = 3_000_000;
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);
        let mut deadline = fc.next_frame_after(mono(T0)).unwrap();
        for _ in 0..20 {
            clock.advance(Duration(P.0 * 9 / 10));
            deadline = fc.next_frame_after(deadline).unwrap();
        }
        assert!(!fc.resync_pending());

        let calls = Rc::new(Cell::new(0_u32));
        {
            let calls = Rc::clone(&calls);
            let clock = Rc::clone(&clock);
            fc.set_resync_callback(move || {
                calls.set(calls.get() + 1);
                let now = clock.ticks();
                mono(now - now.rem_euclid(P.0) - P.0 + SHIFT)
            });
        }
        assert!(fc.resync_pending(), "a new source must force a resync");

        deadline = fc.next_frame_after(deadline).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(deadline.ticks().rem_euclid(P.0), SHIFT, "locked to the new phase");

        clock.advance(Duration(P.0 * 9 / 10));
        let next = fc.next_frame_after(deadline).unwrap();
        assert_eq!(calls.get(), 1, "only the first deadline resyncs");
        assert_eq!(since(next, deadline), P);
    }

    #[test]
    fn future_reference_is_used_as_is() {
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);
        fc.set_resync_callback(|| mono(T0 + 3 * 10_000_000 + 7));
        assert_eq!(fc.next_frame_after(mono(T0)), Ok(mono(T0 + 30_000_007)));
    }

    #[test]
    fn reference_domain_becomes_authoritative() {
        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);
        // Hardware vblank clock, phase-shifted by a quarter period.
        fc.set_resync_callback(|| Timestamp::new(HW, T0 - P.0 + P.0 / 4));

        let b = fc.next_frame_after(mono(T0)).unwrap();
        assert_eq!(b.domain(), HW);
        assert_eq!(b.ticks(), T0 + P.0 / 4);

        clock.advance(Duration(P.0 / 2));
        let c = fc.next_frame_after(b).unwrap();
        assert_eq!(c, b + P);

        // Dropping the hardware reference falls back to the last deadline's domain.
        fc.reset_resync_callback();
        clock.advance(Duration(P.0 / 2));
        let d = fc.next_frame_after(c).unwrap();
        assert_eq!(d.domain(), HW);
        assert_eq!(d.ticks(), T0 + 2 * P.0);
    }

    #[test]
    fn unsupported_clock_surfaces() {
        #[derive(Debug)]
        struct MonotonicOnly;
        impl ClockSource for MonotonicOnly {
            fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
                if domain == ClockId::MONOTONIC {
                    Ok(mono(T0))
                } else {
                    Err(TimeError::UnsupportedClock(domain))
                }
            }
        }

        let mut fc = FrameClock::new(MonotonicOnly);
        fc.set_period(P);
        assert_eq!(
            fc.next_frame_after(Timestamp::new(HW, 0)),
            Err(TimeError::UnsupportedClock(HW))
        );
        assert_eq!(fc.next_frame_after(mono(T0)), Ok(mono(T0) + P));
    }

    #[test]
    fn phase_lock_picks_first_point_after_now() {
        let reference = mono(1_000);
        let p = Duration(100);
        assert_eq!(phase_lock(reference, mono(1_000), p), Ok(mono(1_100)));
        assert_eq!(phase_lock(reference, mono(1_099), p), Ok(mono(1_100)));
        assert_eq!(phase_lock(reference, mono(1_100), p), Ok(mono(1_200)));
        assert_eq!(phase_lock(reference, mono(900), p), Ok(reference));
        assert!(phase_lock(reference, Timestamp::new(HW, 1_000), p).is_err());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn traced_deadlines_report_resyncs() {
        use crate::trace::TraceSink;
        use alloc::vec::Vec;

        #[derive(Default)]
        struct Sink {
            resyncs: u32,
            deadlines: Vec<(i64, bool)>,
        }
        impl TraceSink for Sink {
            fn on_resync(&mut self, _e: &ResyncEvent) {
                self.resyncs += 1;
            }
            fn on_frame_deadline(&mut self, e: &FrameDeadlineEvent) {
                self.deadlines.push((e.target.ticks(), e.resynced));
            }
        }

        let clock = clock_at_t0();
        let mut fc = frame_clock(&clock);
        let mut sink = Sink::default();
        let mut tracer = Tracer::new(&mut sink);
        let b = fc.next_frame_after_traced(mono(T0), &mut tracer).unwrap();
        _ = fc.next_frame_after_traced(b, &mut tracer).unwrap();
        drop(tracer);

        assert_eq!(sink.resyncs, 1);
        assert_eq!(sink.deadlines, &[(T0 + P.0, true), (T0 + 2 * P.0, false)]);
    }
}
