// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX clock reads.

use rustix::time::{ClockId as PosixClockId, Timespec, clock_gettime};

use cadence_core::clock::ClockSource;
use cadence_core::time::{ClockId, TimeError, Timestamp};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// [`ClockSource`] reading the kernel clocks with `clock_gettime`.
///
/// `CLOCK_REALTIME` and `CLOCK_MONOTONIC` are available everywhere;
/// `CLOCK_MONOTONIC_RAW` and `CLOCK_BOOTTIME` only on Linux and Android.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PosixClock;

impl ClockSource for PosixClock {
    fn now(&self, domain: ClockId) -> Result<Timestamp, TimeError> {
        let posix = posix_clock_id(domain).ok_or(TimeError::UnsupportedClock(domain))?;
        Ok(Timestamp::new(
            domain,
            timespec_to_nanos(clock_gettime(posix)),
        ))
    }
}

/// Returns the current `CLOCK_MONOTONIC` time.
#[must_use]
pub fn now() -> Timestamp {
    Timestamp::new(
        ClockId::MONOTONIC,
        timespec_to_nanos(clock_gettime(PosixClockId::Monotonic)),
    )
}

fn posix_clock_id(id: ClockId) -> Option<PosixClockId> {
    match id {
        ClockId::REALTIME => Some(PosixClockId::Realtime),
        ClockId::MONOTONIC => Some(PosixClockId::Monotonic),
        #[cfg(any(target_os = "linux", target_os = "android"))]
        ClockId::MONOTONIC_RAW => Some(PosixClockId::MonotonicRaw),
        #[cfg(any(target_os = "linux", target_os = "android"))]
        ClockId::BOOTTIME => Some(PosixClockId::Boottime),
        _ => None,
    }
}

fn timespec_to_nanos(timespec: Timespec) -> i64 {
    let nanos = i128::from(timespec.tv_nsec).clamp(0, NANOS_PER_SECOND - 1);
    let total = i128::from(timespec.tv_sec)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(nanos);
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}
