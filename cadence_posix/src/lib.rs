// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX clock reads and client-side vsync pacing.
//!
//! - [`PosixClock`] implements [`ClockSource`](cadence_core::clock::ClockSource)
//!   over `clock_gettime`.
//! - [`VsyncPacer`] drives a [`FrameClock`](cadence_core::frame_clock::FrameClock)
//!   the way a client swap loop needs it: a swap interval, sleeping until the
//!   next deadline, and an estimate of the time left before it.

mod pacer;
mod time;

pub use pacer::{SWAP_INTERVAL_ENV, VsyncPacer};
pub use time::{PosixClock, now};
