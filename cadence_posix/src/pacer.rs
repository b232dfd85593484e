// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client-side vsync pacing.

use std::thread;

use tracing::{debug, info, warn};

use cadence_core::clock::ClockSource;
use cadence_core::frame_clock::FrameClock;
use cadence_core::time::{Duration, TimeError, Timestamp};

use crate::time::PosixClock;

/// Environment variable that forces the swap interval, overriding whatever
/// the application requests.
pub const SWAP_INTERVAL_ENV: &str = "CADENCE_FORCE_SWAP_INTERVAL";

/// Paces a client's swap loop against a [`FrameClock`].
///
/// After every presented frame the pacer sleeps for `swap_interval` frame
/// deadlines, so a client rendering faster than the display is throttled to
/// it while a slow client never sleeps past a deadline it already missed.
#[derive(Debug)]
pub struct VsyncPacer<C = PosixClock> {
    frame_clock: FrameClock<C>,
    swap_interval: u32,
    user_swap_interval: Option<u32>,
    last_vsync: Timestamp,
    next_vsync: Timestamp,
}

impl VsyncPacer {
    /// Creates a pacer on `CLOCK_MONOTONIC` with the given frame period.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut frame_clock = FrameClock::new(PosixClock);
        frame_clock.set_period(period);
        Self::with_frame_clock(frame_clock)
    }
}

impl<C: ClockSource> VsyncPacer<C> {
    /// Creates a pacer around an already configured frame clock.
    ///
    /// Reads [`SWAP_INTERVAL_ENV`] once; a valid value pins the swap interval
    /// for the pacer's lifetime.
    pub fn with_frame_clock(frame_clock: FrameClock<C>) -> Self {
        let user = std::env::var(SWAP_INTERVAL_ENV).ok();
        let user_swap_interval = parse_swap_interval(user.as_deref());
        if let Some(interval) = user_swap_interval {
            info!(
                interval,
                "overriding swap interval because {SWAP_INTERVAL_ENV} is set"
            );
        }
        Self::with_swap_interval_override(frame_clock, user_swap_interval)
    }

    fn with_swap_interval_override(frame_clock: FrameClock<C>, user: Option<u32>) -> Self {
        Self {
            frame_clock,
            swap_interval: user.unwrap_or(1),
            user_swap_interval: user,
            last_vsync: Timestamp::default(),
            next_vsync: Timestamp::default(),
        }
    }

    /// The frame clock producing deadlines.
    #[must_use]
    pub fn frame_clock(&self) -> &FrameClock<C> {
        &self.frame_clock
    }

    /// Mutable access to the frame clock, e.g. to change its period or resync
    /// source.
    pub fn frame_clock_mut(&mut self) -> &mut FrameClock<C> {
        &mut self.frame_clock
    }

    /// Number of frame deadlines waited per presented frame.
    #[inline]
    #[must_use]
    pub fn swap_interval(&self) -> u32 {
        self.swap_interval
    }

    /// Requests a swap interval. Ignored while the environment override is
    /// in effect.
    pub fn set_swap_interval(&mut self, interval: u32) {
        self.swap_interval = self.user_swap_interval.unwrap_or(interval);
        debug!(
            requested = interval,
            effective = self.swap_interval,
            "swap interval set"
        );
    }

    /// Deadline of the last vsync this pacer waited for.
    #[inline]
    #[must_use]
    pub fn last_vsync(&self) -> Timestamp {
        self.last_vsync
    }

    /// Time left until the next frame deadline, without sleeping.
    ///
    /// The deadline is remembered so that a frame presented with swap interval
    /// zero still advances the pacer.
    pub fn time_until_next_frame(&mut self) -> Result<std::time::Duration, TimeError> {
        let target = self.frame_clock.next_frame_after(self.last_vsync)?;
        let now = self.frame_clock.clock().now(target.domain())?;
        self.next_vsync = target;
        Ok(target.checked_since(now)?.to_std().unwrap_or_default())
    }

    /// Sleeps until the next frame deadline and returns it.
    pub fn wait_for_vsync(&mut self) -> Result<Timestamp, TimeError> {
        let target = self.frame_clock.next_frame_after(self.last_vsync)?;
        self.sleep_until(target)?;
        // A deadline in a newly adopted domain supersedes the old one.
        if target.is_after(self.last_vsync).unwrap_or(true) {
            self.last_vsync = target;
        }
        Ok(target)
    }

    /// Paces after a buffer swap: waits `swap_interval` deadlines.
    pub fn frame_presented(&mut self) -> Result<(), TimeError> {
        let interval = self.swap_interval;
        for _ in 0..interval {
            self.wait_for_vsync()?;
        }
        if interval == 0 {
            self.last_vsync = self.next_vsync;
        }
        Ok(())
    }

    fn sleep_until(&self, target: Timestamp) -> Result<(), TimeError> {
        let now = self.frame_clock.clock().now(target.domain())?;
        if let Some(remaining) = target.checked_since(now)?.to_std() {
            thread::sleep(remaining);
        }
        Ok(())
    }
}

fn parse_swap_interval(value: Option<&str>) -> Option<u32> {
    let value = value?;
    match value.trim().parse() {
        Ok(interval) => Some(interval),
        Err(_) => {
            warn!(value, "ignoring invalid {SWAP_INTERVAL_ENV}");
            None
        }
    }
}
