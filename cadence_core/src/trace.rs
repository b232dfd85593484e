// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for display pacing.
//!
//! This module provides a [`TraceSink`] trait with one method per pacing
//! event. All method bodies default to no-ops, so implementing only the events
//! you care about is fine.
//!
//! Two producers feed a sink:
//!
//! - the flip coordinator (`cadence_flip`) reports scheduled, completed,
//!   timed-out and cancelled page flips. It calls the sink directly, since a
//!   forced completion must always be reported.
//! - [`FrameClock`](crate::frame_clock::FrameClock) reports resyncs and
//!   computed deadlines through [`Tracer`].
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use crate::output::OutputId;
use crate::time::Timestamp;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a page flip was accepted by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipScheduledEvent {
    /// Output the flip targets.
    pub output: OutputId,
    /// Correlation token assigned to the flip.
    pub token: u64,
    /// Framebuffer that will be scanned out.
    pub buffer: u32,
}

/// Emitted when the hardware reported a page flip as complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipCompletedEvent {
    /// Output whose flip completed.
    pub output: OutputId,
    /// Correlation token of the completed flip.
    pub token: u64,
    /// Vblank time reported with the event, if the driver provides one.
    pub vblank: Option<Timestamp>,
    /// Time between scheduling and completion.
    pub latency: core::time::Duration,
}

/// Emitted exactly once for every flip force-completed after a wait timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipTimeoutEvent {
    /// Output whose flip was given up on.
    pub output: OutputId,
    /// Correlation token of the abandoned flip.
    pub token: u64,
    /// Time between scheduling and the forced completion.
    pub pending_for: core::time::Duration,
}

/// Emitted when a pending flip is abandoned explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipCancelledEvent {
    /// Output whose flip was cancelled.
    pub output: OutputId,
    /// Correlation token of the cancelled flip.
    pub token: u64,
}

/// Emitted when a frame clock queried its reference source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResyncEvent {
    /// Deadline the caller passed in.
    pub previous: Timestamp,
    /// Value returned by the reference source.
    pub reference: Timestamp,
    /// Current time in the reference's domain when the resync happened.
    pub now: Timestamp,
}

/// Emitted for every deadline a frame clock hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDeadlineEvent {
    /// Deadline the caller passed in.
    pub previous: Timestamp,
    /// Deadline returned to the caller.
    pub target: Timestamp,
    /// Whether the deadline came from a resync rather than `previous + period`.
    pub resynced: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives pacing trace events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a flip was handed to the driver.
    fn on_flip_scheduled(&mut self, e: &FlipScheduledEvent) {
        _ = e;
    }

    /// Called when a flip completion event was matched to its output.
    fn on_flip_completed(&mut self, e: &FlipCompletedEvent) {
        _ = e;
    }

    /// Called when a flip was force-completed after a timeout.
    fn on_flip_timeout(&mut self, e: &FlipTimeoutEvent) {
        _ = e;
    }

    /// Called when a pending flip was cancelled.
    fn on_flip_cancelled(&mut self, e: &FlipCancelledEvent) {
        _ = e;
    }

    /// Called when a frame clock resynchronized with its reference.
    fn on_resync(&mut self, e: &ResyncEvent) {
        _ = e;
    }

    /// Called for every computed frame deadline.
    fn on_frame_deadline(&mut self, e: &FrameDeadlineEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ResyncEvent`].
    #[inline]
    pub fn resync(&mut self, e: &ResyncEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resync(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameDeadlineEvent`].
    #[inline]
    pub fn frame_deadline(&mut self, e: &FrameDeadlineEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_deadline(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
