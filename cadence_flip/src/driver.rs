// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel display driver seam.
//!
//! [`FlipDriver`] is what a platform backend implements on top of its
//! display API (for example DRM/KMS `drmModePageFlip` plus reading the DRM
//! file descriptor). The coordinator guarantees that
//! [`poll_for_event`](FlipDriver::poll_for_event) never runs on two threads at
//! once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::output::OutputId;
use cadence_core::time::Timestamp;

/// Correlates a completion event with the flip that requested it.
///
/// Tokens are assigned by the coordinator in increasing order and passed to
/// the driver as user data, which the hardware hands back with the event.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlipToken(pub u64);

impl fmt::Debug for FlipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlipToken({})", self.0)
    }
}

/// Kernel handle of a framebuffer to scan out.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

impl fmt::Debug for FramebufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FramebufferId({})", self.0)
    }
}

/// A page-flip completion reported by the hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipEvent {
    /// Token of the flip that completed.
    pub token: FlipToken,
    /// Vblank time of the completion, if the driver reports one.
    pub vblank: Option<Timestamp>,
}

/// Error reported by a display driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} (os error {code})")]
pub struct DriverError {
    code: i32,
    message: &'static str,
}

impl DriverError {
    /// Creates an error from an errno-like code and a description.
    #[inline]
    #[must_use]
    pub const fn new(code: i32, message: &'static str) -> Self {
        Self { code, message }
    }

    /// The errno-like code.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Human-readable description.
    #[inline]
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

/// Submits page flips and reads their completion events.
pub trait FlipDriver: Send + Sync {
    /// Asks the hardware to scan out `buffer` on `output` at the next vblank,
    /// tagging the completion event with `token`.
    ///
    /// Must not block waiting for the flip itself.
    fn submit_flip(
        &self,
        output: OutputId,
        buffer: FramebufferId,
        token: FlipToken,
    ) -> Result<(), DriverError>;

    /// Blocks for at most `timeout` waiting for one completion event.
    ///
    /// Returns `Ok(None)` when the timeout elapses without an event.
    fn poll_for_event(&self, timeout: Duration) -> Result<Option<FlipEvent>, DriverError>;
}

impl<D: FlipDriver + ?Sized> FlipDriver for &D {
    fn submit_flip(
        &self,
        output: OutputId,
        buffer: FramebufferId,
        token: FlipToken,
    ) -> Result<(), DriverError> {
        (**self).submit_flip(output, buffer, token)
    }

    fn poll_for_event(&self, timeout: Duration) -> Result<Option<FlipEvent>, DriverError> {
        (**self).poll_for_event(timeout)
    }
}

impl<D: FlipDriver + ?Sized> FlipDriver for Box<D> {
    fn submit_flip(
        &self,
        output: OutputId,
        buffer: FramebufferId,
        token: FlipToken,
    ) -> Result<(), DriverError> {
        (**self).submit_flip(output, buffer, token)
    }

    fn poll_for_event(&self, timeout: Duration) -> Result<Option<FlipEvent>, DriverError> {
        (**self).poll_for_event(timeout)
    }
}

impl<D: FlipDriver + ?Sized> FlipDriver for Arc<D> {
    fn submit_flip(
        &self,
        output: OutputId,
        buffer: FramebufferId,
        token: FlipToken,
    ) -> Result<(), DriverError> {
        (**self).submit_flip(output, buffer, token)
    }

    fn poll_for_event(&self, timeout: Duration) -> Result<Option<FlipEvent>, DriverError> {
        (**self).poll_for_event(timeout)
    }
}
