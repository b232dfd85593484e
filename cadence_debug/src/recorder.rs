// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the time
//! elapsed since the recorder was created. [`decode`] reads them back as an
//! iterator of [`Record`].

use std::time::{Duration, Instant};

use cadence_core::output::OutputId;
use cadence_core::time::{ClockId, Timestamp};
use cadence_core::trace::{
    FlipCancelledEvent, FlipCompletedEvent, FlipScheduledEvent, FlipTimeoutEvent,
    FrameDeadlineEvent, ResyncEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FLIP_SCHEDULED: u8 = 1;
const TAG_FLIP_COMPLETED: u8 = 2;
const TAG_FLIP_TIMEOUT: u8 = 3;
const TAG_FLIP_CANCELLED: u8 = 4;
const TAG_RESYNC: u8 = 5;
const TAG_FRAME_DEADLINE: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    origin: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Record times are measured from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            origin: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        self.write_u8(tag);
        let elapsed = self.origin.elapsed();
        self.write_duration(elapsed);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_duration(&mut self, d: Duration) {
        self.write_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    }

    fn write_timestamp(&mut self, t: Timestamp) {
        self.write_u32(t.domain().0);
        self.buf.extend_from_slice(&t.ticks().to_le_bytes());
    }

    fn write_option_timestamp(&mut self, t: Option<Timestamp>) {
        match t {
            Some(t) => {
                self.write_u8(1);
                self.write_timestamp(t);
            }
            None => {
                self.write_u8(0);
                self.write_timestamp(Timestamp::default());
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_flip_scheduled(&mut self, e: &FlipScheduledEvent) {
        self.begin(TAG_FLIP_SCHEDULED);
        self.write_u32(e.output.0);
        self.write_u64(e.token);
        self.write_u32(e.buffer);
    }

    fn on_flip_completed(&mut self, e: &FlipCompletedEvent) {
        self.begin(TAG_FLIP_COMPLETED);
        self.write_u32(e.output.0);
        self.write_u64(e.token);
        self.write_option_timestamp(e.vblank);
        self.write_duration(e.latency);
    }

    fn on_flip_timeout(&mut self, e: &FlipTimeoutEvent) {
        self.begin(TAG_FLIP_TIMEOUT);
        self.write_u32(e.output.0);
        self.write_u64(e.token);
        self.write_duration(e.pending_for);
    }

    fn on_flip_cancelled(&mut self, e: &FlipCancelledEvent) {
        self.begin(TAG_FLIP_CANCELLED);
        self.write_u32(e.output.0);
        self.write_u64(e.token);
    }

    fn on_resync(&mut self, e: &ResyncEvent) {
        self.begin(TAG_RESYNC);
        self.write_timestamp(e.previous);
        self.write_timestamp(e.reference);
        self.write_timestamp(e.now);
    }

    fn on_frame_deadline(&mut self, e: &FrameDeadlineEvent) {
        self.begin(TAG_FRAME_DEADLINE);
        self.write_timestamp(e.previous);
        self.write_timestamp(e.target);
        self.write_u8(u8::from(e.resynced));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`FlipScheduledEvent`].
    FlipScheduled(FlipScheduledEvent),
    /// A [`FlipCompletedEvent`].
    FlipCompleted(FlipCompletedEvent),
    /// A [`FlipTimeoutEvent`].
    FlipTimeout(FlipTimeoutEvent),
    /// A [`FlipCancelledEvent`].
    FlipCancelled(FlipCancelledEvent),
    /// A [`ResyncEvent`].
    Resync(ResyncEvent),
    /// A [`FrameDeadlineEvent`].
    FrameDeadline(FrameDeadlineEvent),
}

/// One decoded record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Time between recorder creation and the event.
    pub elapsed: Duration,
    /// The event itself.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
///
/// Decoding stops at the first truncated or unknown record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take()?))
    }

    fn read_duration(&mut self) -> Option<Duration> {
        Some(Duration::from_nanos(self.read_u64()?))
    }

    fn read_output(&mut self) -> Option<OutputId> {
        Some(OutputId(self.read_u32()?))
    }

    fn read_timestamp(&mut self) -> Option<Timestamp> {
        let domain = ClockId(self.read_u32()?);
        let ticks = i64::from_le_bytes(self.take()?);
        Some(Timestamp::new(domain, ticks))
    }

    fn read_option_timestamp(&mut self) -> Option<Option<Timestamp>> {
        let present = self.read_u8()?;
        let t = self.read_timestamp()?;
        Some((present != 0).then_some(t))
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_FLIP_SCHEDULED => RecordedEvent::FlipScheduled(FlipScheduledEvent {
                output: self.read_output()?,
                token: self.read_u64()?,
                buffer: self.read_u32()?,
            }),
            TAG_FLIP_COMPLETED => RecordedEvent::FlipCompleted(FlipCompletedEvent {
                output: self.read_output()?,
                token: self.read_u64()?,
                vblank: self.read_option_timestamp()?,
                latency: self.read_duration()?,
            }),
            TAG_FLIP_TIMEOUT => RecordedEvent::FlipTimeout(FlipTimeoutEvent {
                output: self.read_output()?,
                token: self.read_u64()?,
                pending_for: self.read_duration()?,
            }),
            TAG_FLIP_CANCELLED => RecordedEvent::FlipCancelled(FlipCancelledEvent {
                output: self.read_output()?,
                token: self.read_u64()?,
            }),
            TAG_RESYNC => RecordedEvent::Resync(ResyncEvent {
                previous: self.read_timestamp()?,
                reference: self.read_timestamp()?,
                now: self.read_timestamp()?,
            }),
            TAG_FRAME_DEADLINE => RecordedEvent::FrameDeadline(FrameDeadlineEvent {
                previous: self.read_timestamp()?,
                target: self.read_timestamp()?,
                resynced: self.read_u8()? != 0,
            }),
            _ => return None,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let elapsed = self.read_duration()?;
        let event = self.decode_event(tag)?;
        Some(Record { elapsed, event })
    }
}
