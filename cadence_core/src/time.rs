// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock-domain tagged time.
//!
//! [`Timestamp`] is a point in time read from one particular clock, tagged
//! with that clock's [`ClockId`]. Hardware vsync timestamps, the server's
//! presentation clock, and the client's monotonic clock may all differ, so
//! timestamps are only comparable within one domain. Ordering and subtraction
//! between timestamps are therefore fallible and return
//! [`TimeError::ClockDomainMismatch`] instead of silently mixing clocks.
//! `Timestamp` intentionally has no `PartialOrd`.
//!
//! [`Duration`] is a signed span in nanoseconds. Adding or subtracting a
//! duration never changes a timestamp's domain, so those operations are
//! infallible.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Identity of a clock source.
///
/// The well-known values use the kernel `clockid_t` numbering, which is what
/// DRM vblank events and `wp_presentation.clock_id` report. Any other value
/// names a custom or hardware clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockId(pub u32);

impl ClockId {
    /// `CLOCK_REALTIME`.
    pub const REALTIME: Self = Self(0);
    /// `CLOCK_MONOTONIC`.
    pub const MONOTONIC: Self = Self(1);
    /// `CLOCK_MONOTONIC_RAW`.
    pub const MONOTONIC_RAW: Self = Self(4);
    /// `CLOCK_BOOTTIME`.
    pub const BOOTTIME: Self = Self(7);

    const fn name(self) -> Option<&'static str> {
        match self {
            Self::REALTIME => Some("REALTIME"),
            Self::MONOTONIC => Some("MONOTONIC"),
            Self::MONOTONIC_RAW => Some("MONOTONIC_RAW"),
            Self::BOOTTIME => Some("BOOTTIME"),
            _ => None,
        }
    }
}

impl Default for ClockId {
    fn default() -> Self {
        Self::MONOTONIC
    }
}

impl fmt::Debug for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "ClockId::{name}"),
            None => write!(f, "ClockId({})", self.0),
        }
    }
}

/// Errors from clock-domain aware time operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// Two timestamps from different clocks were compared or subtracted.
    #[error("cannot combine timestamps from {left:?} and {right:?}")]
    ClockDomainMismatch {
        /// Domain of the left-hand operand.
        left: ClockId,
        /// Domain of the right-hand operand.
        right: ClockId,
    },
    /// The clock source has no way to read the requested clock.
    #[error("{0:?} cannot be read by this clock source")]
    UnsupportedClock(ClockId),
}

/// A signed span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub i64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from nanoseconds.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a duration from microseconds.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros * NANOS_PER_MICRO)
    }

    /// Creates a duration from milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * NANOS_PER_MILLI)
    }

    /// Returns the period of a display refreshing at `hz` times per second.
    ///
    /// Returns [`Duration::ZERO`] for a zero rate.
    #[inline]
    #[must_use]
    pub const fn from_hz(hz: u32) -> Self {
        if hz == 0 {
            return Self::ZERO;
        }
        Self(NANOS_PER_SECOND / hz as i64)
    }

    /// Converts an unsigned standard duration, saturating at `i64::MAX`
    /// nanoseconds.
    #[must_use]
    pub fn from_std(duration: core::time::Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Converts to a standard duration, or `None` if negative.
    #[must_use]
    pub fn to_std(self) -> Option<core::time::Duration> {
        u64::try_from(self.0).ok().map(core::time::Duration::from_nanos)
    }

    /// Returns the span in nanoseconds.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns `true` for a zero-length span.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for a span shorter than zero.
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Number of whole `rhs` spans in `self`, rounded towards negative
    /// infinity.
    ///
    /// # Panics
    ///
    /// Panics if `rhs` is zero.
    #[must_use]
    pub const fn div_floor(self, rhs: Self) -> i64 {
        let quotient = self.0 / rhs.0;
        if self.0 % rhs.0 != 0 && ((self.0 < 0) != (rhs.0 < 0)) {
            quotient - 1
        } else {
            quotient
        }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for Duration {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Neg for Duration {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}

/// A point in time read from a specific clock.
///
/// Ordering and subtraction across clocks are checked and fail with
/// [`TimeError::ClockDomainMismatch`]. `==` is structural: timestamps from
/// different clocks are simply unequal, which keeps `Timestamp` usable as a
/// map key. Use [`try_eq`](Self::try_eq) to surface the mismatch instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    domain: ClockId,
    ticks: i64,
}

impl Timestamp {
    /// Creates a timestamp of `ticks` nanoseconds on clock `domain`.
    #[inline]
    #[must_use]
    pub const fn new(domain: ClockId, ticks: i64) -> Self {
        Self { domain, ticks }
    }

    /// The clock this timestamp was read from.
    #[inline]
    #[must_use]
    pub const fn domain(self) -> ClockId {
        self.domain
    }

    /// Nanoseconds since the clock's epoch.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.ticks
    }

    /// Orders two timestamps from the same clock.
    pub fn try_cmp(self, other: Self) -> Result<Ordering, TimeError> {
        self.same_domain(other)?;
        Ok(self.ticks.cmp(&other.ticks))
    }

    /// Returns `true` if both name the same instant on the same clock.
    pub fn try_eq(self, other: Self) -> Result<bool, TimeError> {
        Ok(self.try_cmp(other)? == Ordering::Equal)
    }

    /// Returns `true` if `self` is strictly earlier than `other`.
    pub fn is_before(self, other: Self) -> Result<bool, TimeError> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    /// Returns `true` if `self` is strictly later than `other`.
    pub fn is_after(self, other: Self) -> Result<bool, TimeError> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    /// Returns `self - earlier` as a signed duration.
    pub fn checked_since(self, earlier: Self) -> Result<Duration, TimeError> {
        self.same_domain(earlier)?;
        Ok(Duration(self.ticks - earlier.ticks))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_add(duration.0) {
            Some(ticks) => Some(Self::new(self.domain, ticks)),
            None => None,
        }
    }

    /// Checked subtraction of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_sub(duration.0) {
            Some(ticks) => Some(Self::new(self.domain, ticks)),
            None => None,
        }
    }

    fn same_domain(self, other: Self) -> Result<(), TimeError> {
        if self.domain == other.domain {
            Ok(())
        } else {
            Err(TimeError::ClockDomainMismatch {
                left: self.domain,
                right: other.domain,
            })
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self::new(self.domain, self.ticks + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.ticks += rhs.0;
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self::new(self.domain, self.ticks - rhs.0)
    }
}

impl SubAssign<Duration> for Timestamp {
    #[inline]
    fn sub_assign(&mut self, rhs: Duration) {
        self.ticks -= rhs.0;
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({:?}, {}ns)", self.domain, self.ticks)
    }
}
